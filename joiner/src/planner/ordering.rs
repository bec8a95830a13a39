//! Strategies deciding in which order join predicates are applied.

use enum_dispatch::enum_dispatch;
use std::cmp::Reverse;
use strum_macros::AsRefStr;

use crate::catalog::Catalog;
use crate::config::OrderingStrategy;
use crate::error::{JoinerError, JoinerResult};
use crate::query::{Comparison, FilterPredicate, JoinPredicate, QueryInfo};
use crate::stat::{estimate_selectivity, Selectivity, ALL};

#[enum_dispatch(PredicateOrderingImpl)]
pub trait PredicateOrdering {
    /// Returns the join predicates of `query` in the order the planner should consume them.
    fn order(&self, query: &QueryInfo, catalog: &Catalog) -> JoinerResult<Vec<JoinPredicate>>;
}

#[enum_dispatch]
#[derive(Clone, Debug, AsRefStr)]
pub enum PredicateOrderingImpl {
    FilterKindOrdering,
    SelectivityOrdering,
}

impl From<OrderingStrategy> for PredicateOrderingImpl {
    fn from(strategy: OrderingStrategy) -> Self {
        match strategy {
            OrderingStrategy::FilterKind => FilterKindOrdering.into(),
            OrderingStrategy::Selectivity => SelectivityOrdering.into(),
        }
    }
}

/// Scores every predicate by the filters on the bindings it touches: an equality filter counts
/// 2000, a greater-than filter 14 and anything else 2. Higher scores go first, ties keep query
/// order.
#[derive(Clone, Debug, Default)]
pub struct FilterKindOrdering;

impl FilterKindOrdering {
    fn filter_score(filter: &FilterPredicate) -> u64 {
        match filter.comparison {
            Comparison::Equal => 2000,
            Comparison::Greater => 14,
            Comparison::Less => 2,
        }
    }

    pub fn score(query: &QueryInfo, predicate: &JoinPredicate) -> u64 {
        query
            .filters()
            .iter()
            .filter(|filter| predicate.touches(filter.column.binding))
            .map(Self::filter_score)
            .sum()
    }
}

impl PredicateOrdering for FilterKindOrdering {
    fn order(&self, query: &QueryInfo, _catalog: &Catalog) -> JoinerResult<Vec<JoinPredicate>> {
        let mut predicates = query.predicates().to_vec();
        predicates.sort_by_key(|p| Reverse(Self::score(query, p)));
        Ok(predicates)
    }
}

/// Orders predicates by the combined estimated selectivity of the filters on the bindings they
/// touch, most selective first. Ties keep query order.
#[derive(Clone, Debug, Default)]
pub struct SelectivityOrdering;

impl SelectivityOrdering {
    pub fn combined_selectivity(
        query: &QueryInfo,
        catalog: &Catalog,
        predicate: &JoinPredicate,
    ) -> JoinerResult<Selectivity> {
        query
            .filters()
            .iter()
            .filter(|filter| predicate.touches(filter.column.binding))
            .try_fold(ALL, |acc, filter| {
                let selectivity = match filter.selectivity {
                    Some(s) => s,
                    None => estimate_filter(catalog, filter)?,
                };
                Ok(acc.and(selectivity))
            })
    }
}

impl PredicateOrdering for SelectivityOrdering {
    fn order(&self, query: &QueryInfo, catalog: &Catalog) -> JoinerResult<Vec<JoinPredicate>> {
        let mut scored = query
            .predicates()
            .iter()
            .map(|p| Ok((Self::combined_selectivity(query, catalog, p)?, *p)))
            .collect::<JoinerResult<Vec<_>>>()?;
        scored.sort_by(|(a, _), (b, _)| a.value().total_cmp(&b.value()));
        Ok(scored.into_iter().map(|(_, p)| p).collect())
    }
}

/// Estimates a filter from the histogram of its column.
pub fn estimate_filter(catalog: &Catalog, filter: &FilterPredicate) -> JoinerResult<Selectivity> {
    let relation = catalog.relation(filter.column.relation_id)?;
    let histogram =
        relation
            .histogram(filter.column.column_id)
            .ok_or(JoinerError::ColumnOutOfRange {
                column: filter.column,
                relation_id: filter.column.relation_id,
                num_columns: relation.num_columns(),
            })?;
    Ok(estimate_selectivity(
        histogram,
        filter.comparison,
        filter.constant,
    ))
}

#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, Relation};
    use crate::planner::{FilterKindOrdering, PredicateOrdering, SelectivityOrdering};
    use crate::query::{ColumnRef, Comparison, FilterPredicate, JoinPredicate, QueryInfo};

    fn catalog() -> Catalog {
        (0..3)
            .map(|_| {
                let rows = (0..100u64).map(|v| [v, v]).collect::<Vec<_>>();
                Relation::from_rows(&rows, 20).unwrap()
            })
            .collect()
    }

    fn col(binding: usize, column: usize) -> ColumnRef {
        ColumnRef::new(binding, binding, column)
    }

    fn query(filters: Vec<FilterPredicate>) -> QueryInfo {
        QueryInfo::new(
            vec![0, 1, 2],
            vec![
                JoinPredicate::equi(col(0, 0), col(1, 0)),
                JoinPredicate::equi(col(1, 1), col(2, 0)),
                JoinPredicate::equi(col(0, 1), col(2, 1)),
            ],
            filters,
            vec![col(0, 0)],
        )
        .unwrap()
    }

    #[test]
    fn test_filter_kind_scores() {
        let query = query(vec![
            FilterPredicate::new(col(2, 0), Comparison::Equal, 5),
            FilterPredicate::new(col(1, 0), Comparison::Greater, 5),
            FilterPredicate::new(col(1, 1), Comparison::Less, 5),
        ]);
        let scores = query
            .predicates()
            .iter()
            .map(|p| FilterKindOrdering::score(&query, p))
            .collect::<Vec<_>>();

        assert_eq!(vec![16, 2016, 2000], scores);
        assert_eq!(
            vec![
                query.predicates()[1],
                query.predicates()[2],
                query.predicates()[0]
            ],
            FilterKindOrdering.order(&query, &catalog()).unwrap()
        );
    }

    #[test]
    fn test_ties_keep_query_order() {
        let query = query(vec![]);

        assert_eq!(
            query.predicates().to_vec(),
            FilterKindOrdering.order(&query, &catalog()).unwrap()
        );
        assert_eq!(
            query.predicates().to_vec(),
            SelectivityOrdering.order(&query, &catalog()).unwrap()
        );
    }

    #[test]
    fn test_selectivity_ordering() {
        // Binding 1 keeps 90% of its rows, binding 2 10%.
        let query = query(vec![
            FilterPredicate::new(col(1, 0), Comparison::Greater, 9),
            FilterPredicate::new(col(2, 0), Comparison::Less, 10),
        ]);

        assert_eq!(
            vec![
                query.predicates()[1],
                query.predicates()[2],
                query.predicates()[0]
            ],
            SelectivityOrdering.order(&query, &catalog()).unwrap()
        );
    }
}
