//! Physical operators of a join plan.
//!
//! Execution is split in two passes. While the plan is being built, parents call
//! [`Operator::require`] on their inputs for every column they will read, so each operator knows
//! exactly which columns to materialize. Then [`Operator::run`] is called once on the root and
//! recursively executes the tree. An operator moves through [`OperatorState::Unplanned`],
//! [`OperatorState::Required`] and [`OperatorState::Executed`], and never goes back.

use enum_as_inner::EnumAsInner;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use strum_macros::AsRefStr;

mod scan;
pub use scan::*;
mod filter_scan;
pub use filter_scan::*;
mod join;
pub use join::*;
mod self_join;
pub use self_join::*;
mod checksum;
pub use checksum::*;

use crate::error::{JoinerError, JoinerResult};
use crate::query::ColumnRef;

pub trait DisplayFields {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result;
}

/// Lifecycle of an operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperatorState {
    Unplanned,
    Required,
    Executed,
}

/// A result column, either a view of base relation data or produced by an operator.
#[derive(Debug)]
pub enum ColumnData<'a> {
    Borrowed(&'a [u64]),
    Owned(Vec<u64>),
}

impl<'a> Deref for ColumnData<'a> {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        match self {
            ColumnData::Borrowed(values) => values,
            ColumnData::Owned(values) => values,
        }
    }
}

/// Materialized output of an operator.
#[derive(Debug, Default)]
pub struct ResultSet<'a> {
    columns: Vec<ColumnData<'a>>,
    column_ids: HashMap<ColumnRef, usize>,
    size: usize,
}

impl<'a> ResultSet<'a> {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn push(&mut self, column: ColumnRef, data: ColumnData<'a>) -> usize {
        debug_assert_eq!(self.size, data.len());
        let idx = self.columns.len();
        self.columns.push(data);
        self.column_ids.insert(column, idx);
        idx
    }

    pub fn resolve(&self, column: ColumnRef) -> JoinerResult<usize> {
        self.column_ids
            .get(&column)
            .copied()
            .ok_or(JoinerError::UnresolvedColumn(column))
    }

    pub fn column(&self, idx: usize) -> &[u64] {
        &self.columns[idx]
    }

    pub fn columns(&self) -> Vec<&[u64]> {
        self.columns.iter().map(Deref::deref).collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Physical operator.
#[derive(Debug, EnumAsInner, AsRefStr)]
pub enum Operator<'a> {
    Scan(Scan<'a>),
    FilterScan(FilterScan<'a>),
    Join(Join<'a>),
    SelfJoin(SelfJoin<'a>),
    Checksum(Checksum<'a>),
}

impl<'a> Operator<'a> {
    /// Asks this operator to produce `column`. Returns `false` if the column does not belong to
    /// any binding below it.
    pub fn require(&mut self, column: ColumnRef) -> JoinerResult<bool> {
        match self {
            Operator::Scan(op) => op.require(column),
            Operator::FilterScan(op) => op.require(column),
            Operator::Join(op) => op.require(column),
            Operator::SelfJoin(op) => op.require(column),
            Operator::Checksum(op) => op.require(column),
        }
    }

    /// Executes this operator and everything below it.
    pub fn run(&mut self) -> JoinerResult<()> {
        match self {
            Operator::Scan(op) => op.run(),
            Operator::FilterScan(op) => op.run(),
            Operator::Join(op) => op.run(),
            Operator::SelfJoin(op) => op.run(),
            Operator::Checksum(op) => op.run(),
        }
    }

    /// Output of an executed operator.
    pub fn result(&self) -> &ResultSet<'a> {
        match self {
            Operator::Scan(op) => op.result(),
            Operator::FilterScan(op) => op.result(),
            Operator::Join(op) => op.result(),
            Operator::SelfJoin(op) => op.result(),
            Operator::Checksum(op) => op.result(),
        }
    }

    pub fn state(&self) -> OperatorState {
        match self {
            Operator::Scan(op) => op.state(),
            Operator::FilterScan(op) => op.state(),
            Operator::Join(op) => op.state(),
            Operator::SelfJoin(op) => op.state(),
            Operator::Checksum(op) => op.state(),
        }
    }

    pub fn inputs(&self) -> Vec<&Operator<'a>> {
        match self {
            Operator::Scan(_) | Operator::FilterScan(_) => vec![],
            Operator::Join(op) => vec![op.left(), op.right()],
            Operator::SelfJoin(op) => vec![op.input()],
            Operator::Checksum(op) => vec![op.input()],
        }
    }

    pub fn results(&self) -> Vec<&[u64]> {
        self.result().columns()
    }

    pub fn resolve(&self, column: ColumnRef) -> JoinerResult<usize> {
        self.result().resolve(column)
    }

    pub fn column(&self, idx: usize) -> &[u64] {
        self.result().column(idx)
    }

    pub fn result_size(&self) -> usize {
        self.result().size()
    }

    fn display_fields(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Scan(op) => op.display(f),
            Operator::FilterScan(op) => op.display(f),
            Operator::Join(op) => op.display(f),
            Operator::SelfJoin(op) => op.display(f),
            Operator::Checksum(op) => op.display(f),
        }
    }
}

impl<'a> Display for Operator<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())?;
        self.display_fields(f)
    }
}

/// Moves `state` to `Required`, failing once the operator has run.
pub(crate) fn mark_required(
    operator: &'static str,
    state: &mut OperatorState,
) -> JoinerResult<()> {
    if *state == OperatorState::Executed {
        return Err(JoinerError::InvalidOperatorState {
            operator,
            action: "require",
            state: *state,
        });
    }
    *state = OperatorState::Required;
    Ok(())
}

/// Checks an operator may run, it runs at most once.
pub(crate) fn check_runnable(operator: &'static str, state: OperatorState) -> JoinerResult<()> {
    if state == OperatorState::Executed {
        return Err(JoinerError::InvalidOperatorState {
            operator,
            action: "run",
            state,
        });
    }
    Ok(())
}
