//! ## Background
//!
//! This crate evaluates batches of conjunctive join queries over in-memory relations of unsigned
//! 64 bit integers. A query binds a list of relations, joins them with column equalities,
//! filters them with column/constant comparisons, and asks for the sum of some columns of the
//! result.
//!
//! Queries are answered by a classic left deep plan. The planner orders the join predicates
//! with a cheap heuristic (or, alternatively, with histogram based selectivity estimates) and
//! then folds them one by one into a tree of physical operators. Since relations are read only,
//! scans expose the stored columns directly and only joins and filters materialize new ones.
//!
//! ## Design
//!
//! * [`catalog`] Relation storage and per column histograms.
//! * [`stat`] Histograms and selectivity estimation.
//! * [`query`] Structured form of a query.
//! * [`planner`] Predicate ordering and left deep plan construction.
//! * [`operator`] Physical operators and the require/run protocol.
//! * [`parallel`] Partitioned hash join, range filtering and scatter merges.
//! * [`scheduler`] Concurrent execution of query batches.
//!
//! Parallelism is decided per operator from the [`config::ParallelPolicy`] it is built with.
//! Joins split both inputs by `key mod workers`, so every worker owns a private hash table, and
//! all operators merge per worker results by writing into precomputed disjoint output ranges.

#[macro_use]
extern crate lazy_static;

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod operator;
pub mod parallel;
pub mod plan;
pub mod planner;
pub mod query;
pub mod scheduler;
pub mod stat;

#[cfg(test)]
mod test_utils;
