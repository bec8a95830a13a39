use log::{debug, log_enabled, Level};

use crate::context::ExecutionContext;
use crate::error::JoinerResult;
use crate::operator::QueryOutput;
use crate::plan::explain::explain_to_string;
use crate::planner::JoinPlanner;
use crate::query::QueryInfo;

/// Plans and runs one query against the context's catalog.
pub fn execute_query(context: &ExecutionContext, query: &QueryInfo) -> JoinerResult<QueryOutput> {
    let plan = JoinPlanner::new(context).plan(query)?;
    if log_enabled!(Level::Debug) {
        debug!("Plan of query {}:\n{}", query, explain_to_string(&plan)?);
    }
    plan.execute()
}

#[cfg(test)]
mod tests {
    use crate::config::ExecutionConfig;
    use crate::context::ExecutionContext;
    use crate::executor::execute_query;
    use crate::query::{ColumnRef, Comparison, FilterPredicate, JoinPredicate, QueryInfo};
    use crate::test_utils::{catalog_from_rows, generated_relation};

    #[test]
    fn test_two_way_join() {
        let context = ExecutionContext::with_catalog(catalog_from_rows(vec![
            vec![vec![1, 10], vec![2, 20], vec![3, 30]],
            vec![vec![1, 100], vec![3, 300], vec![4, 400]],
        ]));
        let query = QueryInfo::new(
            vec![0, 1],
            vec![JoinPredicate::equi(
                ColumnRef::new(0, 0, 0),
                ColumnRef::new(1, 1, 0),
            )],
            vec![],
            vec![ColumnRef::new(0, 0, 1), ColumnRef::new(1, 1, 1)],
        )
        .unwrap();

        assert_eq!("40 400", execute_query(&context, &query).unwrap().to_string());
    }

    #[test]
    fn test_empty_result() {
        let context = ExecutionContext::with_catalog(catalog_from_rows(vec![
            vec![vec![1, 10], vec![2, 20]],
            vec![vec![5, 100]],
        ]));
        let query = QueryInfo::new(
            vec![0, 1],
            vec![JoinPredicate::equi(
                ColumnRef::new(0, 0, 0),
                ColumnRef::new(1, 1, 0),
            )],
            vec![],
            vec![ColumnRef::new(0, 0, 1), ColumnRef::new(1, 1, 1)],
        )
        .unwrap();

        assert_eq!(
            "NULL NULL",
            execute_query(&context, &query).unwrap().to_string()
        );
    }

    #[test]
    fn test_worker_count_invariance() {
        let mut catalog = crate::catalog::Catalog::new();
        catalog.add_relation(generated_relation(3_000, 3, |row, col| {
            (row * (col as u64 + 3)) % 1_000
        }));
        catalog.add_relation(generated_relation(1_000, 2, |row, col| {
            (row + col as u64) % 700
        }));
        let query = QueryInfo::new(
            vec![0, 1, 0],
            vec![
                JoinPredicate::equi(ColumnRef::new(0, 0, 0), ColumnRef::new(1, 1, 0)),
                JoinPredicate::equi(ColumnRef::new(1, 1, 1), ColumnRef::new(2, 0, 1)),
                JoinPredicate::equi(ColumnRef::new(0, 0, 2), ColumnRef::new(2, 0, 2)),
            ],
            vec![FilterPredicate::new(ColumnRef::new(0, 0, 1), Comparison::Less, 500)],
            vec![ColumnRef::new(0, 0, 2), ColumnRef::new(1, 1, 1), ColumnRef::new(2, 0, 0)],
        )
        .unwrap();

        let mut context = ExecutionContext::with_catalog(catalog);
        context.config = ExecutionConfig::default().with_fixed_workers(1);
        let expected = execute_query(&context, &query).unwrap();
        assert!(expected.result_size > 0);

        for workers in [2, 8] {
            context.config = ExecutionConfig::default().with_fixed_workers(workers);
            assert_eq!(expected, execute_query(&context, &query).unwrap());
        }
    }
}
