use itertools::Itertools;
use log::debug;
use std::fmt::Formatter;

use crate::config::ParallelPolicy;
use crate::error::{JoinerError, JoinerResult};
use crate::operator::{
    check_runnable, mark_required, ColumnData, DisplayFields, Operator, OperatorState, ResultSet,
};
use crate::parallel::{filter_rows, gather, ScatterLayout};
use crate::query::{ColumnRef, JoinPredicate};

/// Keeps the input rows on which both columns of the predicate are already present and satisfy
/// it. Used when a predicate connects two bindings that are joined already.
#[derive(Debug)]
pub struct SelfJoin<'a> {
    input: Box<Operator<'a>>,
    predicate: JoinPredicate,
    policy: ParallelPolicy,
    required: Vec<ColumnRef>,
    result: ResultSet<'a>,
    state: OperatorState,
}

impl<'a> SelfJoin<'a> {
    pub fn new(
        mut input: Operator<'a>,
        predicate: JoinPredicate,
        policy: ParallelPolicy,
    ) -> JoinerResult<Self> {
        for column in [predicate.left, predicate.right] {
            if !input.require(column)? {
                return Err(JoinerError::UnresolvedColumn(column));
            }
        }
        Ok(Self {
            input: Box::new(input),
            predicate,
            policy,
            required: vec![],
            result: ResultSet::default(),
            state: OperatorState::Unplanned,
        })
    }

    pub fn input(&self) -> &Operator<'a> {
        &self.input
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    pub fn require(&mut self, column: ColumnRef) -> JoinerResult<bool> {
        if self.required.contains(&column) {
            return Ok(true);
        }
        if !self.input.require(column)? {
            return Ok(false);
        }
        mark_required("SelfJoin", &mut self.state)?;
        self.required.push(column);
        Ok(true)
    }

    pub fn run(&mut self) -> JoinerResult<()> {
        check_runnable("SelfJoin", self.state)?;
        self.input.run()?;

        let input = &self.input;
        let left = input.column(input.resolve(self.predicate.left)?);
        let right = input.column(input.resolve(self.predicate.right)?);
        let comparison = self.predicate.comparison;
        let workers = self.policy.workers_for(input.result_size());
        let kept = filter_rows(input.result_size(), workers, |row| {
            comparison.evaluate(left[row], right[row])
        });
        let layout = ScatterLayout::from_lengths(kept.iter().map(Vec::len));
        let rows = kept.iter().map(Vec::as_slice).collect_vec();

        let mut result = ResultSet::new(layout.total());
        for column in &self.required {
            let values = input.column(input.resolve(*column)?);
            result.push(*column, ColumnData::Owned(gather(values, &layout, &rows)));
        }
        debug!(
            "SelfJoin {} kept {} of {} rows with {} workers",
            self.predicate,
            layout.total(),
            input.result_size(),
            workers
        );

        self.result = result;
        self.state = OperatorState::Executed;
        Ok(())
    }

    pub fn result(&self) -> &ResultSet<'a> {
        &self.result
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }
}

impl<'a> DisplayFields for SelfJoin<'a> {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("predicate", &format_args!("{}", self.predicate))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Relation;
    use crate::config::ParallelPolicy;
    use crate::operator::{Operator, Scan, SelfJoin};
    use crate::query::{ColumnRef, Comparison, JoinPredicate};

    #[test]
    fn test_self_join_keeps_matching_rows_in_order() {
        let rows = (0..1000u64).map(|v| [v % 7, v % 3, v]).collect::<Vec<_>>();
        let relation = Relation::from_rows(&rows, 20).unwrap();
        let predicate = JoinPredicate::equi(ColumnRef::new(0, 0, 0), ColumnRef::new(0, 0, 1));
        let expected = (0..1000u64).filter(|v| v % 7 == v % 3).collect::<Vec<_>>();

        for workers in [1, 2, 8] {
            let scan = Operator::Scan(Scan::new(&relation, 0, 0));
            let mut self_join =
                SelfJoin::new(scan, predicate, ParallelPolicy::fixed(workers)).unwrap();
            self_join.require(ColumnRef::new(0, 0, 2)).unwrap();
            self_join.run().unwrap();

            assert_eq!(&expected[..], self_join.result().column(0));
        }
    }

    #[test]
    fn test_self_join_other_comparisons() {
        let relation = Relation::from_rows(&[[1, 2], [2, 2], [3, 2]], 20).unwrap();
        let predicate = JoinPredicate::new(
            ColumnRef::new(0, 0, 0),
            ColumnRef::new(0, 0, 1),
            Comparison::Greater,
        );
        let scan = Operator::Scan(Scan::new(&relation, 0, 0));
        let mut self_join = SelfJoin::new(scan, predicate, ParallelPolicy::sequential()).unwrap();
        self_join.require(ColumnRef::new(0, 0, 0)).unwrap();
        self_join.run().unwrap();

        assert_eq!(vec![&[3u64][..]], self_join.result().columns());
    }

    #[test]
    fn test_unknown_binding() {
        let relation = Relation::from_rows(&[[1, 2]], 20).unwrap();
        let predicate = JoinPredicate::equi(ColumnRef::new(0, 0, 0), ColumnRef::new(1, 0, 1));
        let scan = Operator::Scan(Scan::new(&relation, 0, 0));

        assert!(SelfJoin::new(scan, predicate, ParallelPolicy::default()).is_err());
    }
}
