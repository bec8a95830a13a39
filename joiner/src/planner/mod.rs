//! Join planner.
//!
//! Plans are built left deep. The join predicates are first ordered by a
//! [`PredicateOrdering`] strategy, then consumed one at a time: the first equality between two
//! different bindings seeds the tree with a join of two scans, and every following predicate
//! either joins one new binding to the tree, turns into a [`SelfJoin`] when both of its bindings
//! are joined already, or is deferred until it can do one of the two. Only equalities join new
//! bindings, `<` and `>` between bindings always end up in a [`SelfJoin`].

use itertools::Itertools;
use log::{debug, trace};
use std::collections::{BTreeSet, VecDeque};

mod graph;
pub use graph::*;
mod ordering;
pub use ordering::*;

use crate::context::ExecutionContext;
use crate::error::{JoinerError, JoinerResult};
use crate::operator::{Checksum, FilterScan, Join, Operator, Scan, SelfJoin};
use crate::plan::QueryPlan;
use crate::query::{Binding, Comparison, JoinPredicate, QueryInfo};

/// Which sides of a predicate are already produced by the tree built so far.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueryGraphProvides {
    Left,
    Right,
    Both,
    None,
}

impl QueryGraphProvides {
    pub fn analyze(joined: &BTreeSet<Binding>, predicate: &JoinPredicate) -> Self {
        match (
            joined.contains(&predicate.left.binding),
            joined.contains(&predicate.right.binding),
        ) {
            (true, true) => QueryGraphProvides::Both,
            (true, false) => QueryGraphProvides::Left,
            (false, true) => QueryGraphProvides::Right,
            (false, false) => QueryGraphProvides::None,
        }
    }
}

pub struct JoinPlanner<'a> {
    context: &'a ExecutionContext,
    ordering: PredicateOrderingImpl,
}

impl<'a> JoinPlanner<'a> {
    pub fn new(context: &'a ExecutionContext) -> Self {
        Self::with_ordering(context, context.config.ordering.into())
    }

    pub fn with_ordering(context: &'a ExecutionContext, ordering: PredicateOrderingImpl) -> Self {
        Self { context, ordering }
    }

    pub fn plan(&self, query: &QueryInfo) -> JoinerResult<QueryPlan<'a>> {
        let mut query = query.clone();
        self.annotate_selectivities(&mut query)?;
        QueryGraph::from_query(&query).check_connected()?;

        let mut pending: VecDeque<JoinPredicate> = self
            .ordering
            .order(&query, &self.context.catalog)?
            .into();
        debug!(
            "Predicate order by {}: {}",
            self.ordering.as_ref(),
            pending.iter().join(", ")
        );

        let seed = pending
            .iter()
            .position(is_join_edge)
            .and_then(|idx| pending.remove(idx));
        let mut joined = BTreeSet::new();
        let mut root = match seed {
            Some(seed) => {
                let left = self.scan(&query, seed.left.binding, &mut joined)?;
                let right = self.scan(&query, seed.right.binding, &mut joined)?;
                self.join(left, right, seed)?
            }
            // Without equality edges the query has a single binding.
            None => self.scan(&query, 0, &mut joined)?,
        };

        let mut deferred = 0;
        while let Some(predicate) = pending.pop_front() {
            let provides = QueryGraphProvides::analyze(&joined, &predicate);
            trace!("Predicate {} provided by {:?}", predicate, provides);
            // Only equalities can add a binding, other comparisons wait until both sides are joined.
            let provides = match provides {
                QueryGraphProvides::Left | QueryGraphProvides::Right
                    if predicate.comparison != Comparison::Equal =>
                {
                    QueryGraphProvides::None
                }
                provides => provides,
            };
            root = match provides {
                QueryGraphProvides::Left => {
                    let right = self.scan(&query, predicate.right.binding, &mut joined)?;
                    self.join(root, right, predicate)?
                }
                QueryGraphProvides::Right => {
                    let left = self.scan(&query, predicate.left.binding, &mut joined)?;
                    self.join(left, root, predicate)?
                }
                QueryGraphProvides::Both => Operator::SelfJoin(SelfJoin::new(
                    root,
                    predicate,
                    self.context.config.self_join,
                )?),
                QueryGraphProvides::None => {
                    if deferred > pending.len() {
                        return Err(JoinerError::DisconnectedQueryGraph {
                            components: QueryGraph::from_query(&query).components(),
                        });
                    }
                    deferred += 1;
                    pending.push_back(predicate);
                    continue;
                }
            };
            deferred = 0;
        }

        QueryPlan::new(Operator::Checksum(Checksum::new(
            root,
            query.selections().to_vec(),
        )?))
    }

    fn annotate_selectivities(&self, query: &mut QueryInfo) -> JoinerResult<()> {
        for filter in query.filters_mut() {
            let selectivity = estimate_filter(&self.context.catalog, filter)?;
            trace!("Filter {} selectivity {:?}", filter, selectivity);
            filter.selectivity = Some(selectivity);
        }
        Ok(())
    }

    fn scan(
        &self,
        query: &QueryInfo,
        binding: Binding,
        joined: &mut BTreeSet<Binding>,
    ) -> JoinerResult<Operator<'a>> {
        let context: &'a ExecutionContext = self.context;
        let relation_id = *query
            .relation_ids()
            .get(binding)
            .ok_or_else(|| JoinerError::InvalidQuery(format!("unknown binding {}", binding)))?;
        let relation = context.catalog.relation(relation_id)?;
        joined.insert(binding);

        let filters = query.filters_on(binding).copied().collect_vec();
        if filters.is_empty() {
            Ok(Operator::Scan(Scan::new(relation, binding, relation_id)))
        } else {
            Ok(Operator::FilterScan(FilterScan::new(
                relation,
                binding,
                relation_id,
                filters,
                context.config.filter_scan,
            )?))
        }
    }

    fn join(
        &self,
        left: Operator<'a>,
        right: Operator<'a>,
        predicate: JoinPredicate,
    ) -> JoinerResult<Operator<'a>> {
        Ok(Operator::Join(Join::new(
            left,
            right,
            predicate,
            self.context.config.join,
        )?))
    }
}
