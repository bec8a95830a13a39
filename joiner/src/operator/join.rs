use itertools::Itertools;
use log::debug;
use std::fmt::Formatter;

use crate::config::ParallelPolicy;
use crate::error::{JoinerError, JoinerResult};
use crate::operator::{
    check_runnable, mark_required, ColumnData, DisplayFields, Operator, OperatorState, ResultSet,
};
use crate::parallel::{gather, hash_join, MatchedRows, ScatterLayout};
use crate::query::{ColumnRef, Comparison, JoinPredicate};

/// Partitioned hash equi-join of two inputs.
///
/// `predicate.left` is produced by the left input and `predicate.right` by the right one. At run
/// time the smaller input becomes the build side.
#[derive(Debug)]
pub struct Join<'a> {
    left: Box<Operator<'a>>,
    right: Box<Operator<'a>>,
    predicate: JoinPredicate,
    policy: ParallelPolicy,
    required_left: Vec<ColumnRef>,
    required_right: Vec<ColumnRef>,
    result: ResultSet<'a>,
    state: OperatorState,
}

impl<'a> Join<'a> {
    /// Creates the join and requires the key columns from its inputs.
    pub fn new(
        mut left: Operator<'a>,
        mut right: Operator<'a>,
        predicate: JoinPredicate,
        policy: ParallelPolicy,
    ) -> JoinerResult<Self> {
        if predicate.comparison != Comparison::Equal {
            return Err(JoinerError::UnsupportedJoinComparison(
                predicate.comparison,
                predicate.to_string(),
            ));
        }
        if !left.require(predicate.left)? {
            return Err(JoinerError::UnresolvedColumn(predicate.left));
        }
        if !right.require(predicate.right)? {
            return Err(JoinerError::UnresolvedColumn(predicate.right));
        }

        Ok(Self {
            left: Box::new(left),
            right: Box::new(right),
            predicate,
            policy,
            required_left: vec![],
            required_right: vec![],
            result: ResultSet::default(),
            state: OperatorState::Unplanned,
        })
    }

    pub fn left(&self) -> &Operator<'a> {
        &self.left
    }

    pub fn right(&self) -> &Operator<'a> {
        &self.right
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    pub fn require(&mut self, column: ColumnRef) -> JoinerResult<bool> {
        if self.required_left.contains(&column) || self.required_right.contains(&column) {
            return Ok(true);
        }
        if self.left.require(column)? {
            self.required_left.push(column);
        } else if self.right.require(column)? {
            self.required_right.push(column);
        } else {
            return Ok(false);
        }
        mark_required("Join", &mut self.state)?;
        Ok(true)
    }

    pub fn run(&mut self) -> JoinerResult<()> {
        check_runnable("Join", self.state)?;
        let (left, right) = (&mut self.left, &mut self.right);
        let (left_result, right_result) = rayon::join(|| left.run(), || right.run());
        left_result?;
        right_result?;

        if self.left.result_size() > self.right.result_size() {
            std::mem::swap(&mut self.left, &mut self.right);
            std::mem::swap(&mut self.required_left, &mut self.required_right);
            self.predicate = self.predicate.swapped();
        }

        let (build, probe) = (&self.left, &self.right);
        let build_keys = build.column(build.resolve(self.predicate.left)?);
        let probe_keys = probe.column(probe.resolve(self.predicate.right)?);
        let workers = self.policy.workers_for(probe.result_size());
        let matches = hash_join(build_keys, probe_keys, workers);

        let layout = ScatterLayout::from_lengths(matches.iter().map(MatchedRows::len));
        let build_rows = matches.iter().map(|m| m.build.as_slice()).collect_vec();
        let probe_rows = matches.iter().map(|m| m.probe.as_slice()).collect_vec();

        let mut result = ResultSet::new(layout.total());
        for (input, rows, required) in [
            (build, &build_rows, &self.required_left),
            (probe, &probe_rows, &self.required_right),
        ] {
            for column in required {
                let values = input.column(input.resolve(*column)?);
                result.push(*column, ColumnData::Owned(gather(values, &layout, rows)));
            }
        }
        debug!(
            "Join {} built {} rows, probed {} rows with {} workers, produced {} rows",
            self.predicate,
            build.result_size(),
            probe.result_size(),
            workers,
            layout.total()
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

impl<'a> DisplayFields for Join<'a> {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("predicate", &format_args!("{}", self.predicate))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::catalog::Relation;
    use crate::config::ParallelPolicy;
    use crate::error::JoinerError;
    use crate::operator::{Join, Operator, OperatorState, Scan};
    use crate::query::{ColumnRef, Comparison, JoinPredicate};

    fn scan(relation: &Relation, binding: usize) -> Operator<'_> {
        Operator::Scan(Scan::new(relation, binding, binding))
    }

    fn rows(join: &Join<'_>, columns: &[ColumnRef]) -> Vec<Vec<u64>> {
        let ids = columns
            .iter()
            .map(|c| join.result().resolve(*c).unwrap())
            .collect_vec();
        (0..join.result().size())
            .map(|row| ids.iter().map(|id| join.result().column(*id)[row]).collect())
            .sorted()
            .collect()
    }

    #[test]
    fn test_join_matches_all_duplicates() {
        let r = Relation::from_rows(&[[1, 10], [2, 20], [1, 11]], 20).unwrap();
        let s = Relation::from_rows(&[[1, 100], [1, 101], [3, 300]], 20).unwrap();
        let predicate = JoinPredicate::equi(ColumnRef::new(0, 0, 0), ColumnRef::new(1, 1, 0));
        let (r1, s1) = (ColumnRef::new(0, 0, 1), ColumnRef::new(1, 1, 1));

        let mut join =
            Join::new(scan(&r, 0), scan(&s, 1), predicate, ParallelPolicy::sequential()).unwrap();
        assert_eq!(OperatorState::Unplanned, join.state());
        assert!(join.require(r1).unwrap());
        assert!(join.require(s1).unwrap());
        assert!(!join.require(ColumnRef::new(2, 2, 0)).unwrap());
        join.run().unwrap();

        assert_eq!(4, join.result().size());
        assert_eq!(
            vec![vec![10, 100], vec![10, 101], vec![11, 100], vec![11, 101]],
            rows(&join, &[r1, s1])
        );
    }

    #[test]
    fn test_larger_left_input_is_swapped() {
        let r = Relation::from_rows(&(0..50u64).map(|v| [v % 5]).collect_vec(), 20).unwrap();
        let s = Relation::from_rows(&[[3], [4]], 20).unwrap();
        let predicate = JoinPredicate::equi(ColumnRef::new(0, 0, 0), ColumnRef::new(1, 1, 0));

        let mut join =
            Join::new(scan(&r, 0), scan(&s, 1), predicate, ParallelPolicy::fixed(4)).unwrap();
        join.require(ColumnRef::new(0, 0, 0)).unwrap();
        join.require(ColumnRef::new(1, 1, 0)).unwrap();
        join.run().unwrap();

        assert_eq!(20, join.result().size());
        assert_eq!(1, join.left().as_scan().unwrap().binding());
        assert!(rows(&join, &[ColumnRef::new(0, 0, 0), ColumnRef::new(1, 1, 0)])
            .iter()
            .all(|row| row[0] == row[1]));
    }

    #[test]
    fn test_non_equal_join_rejected() {
        let r = Relation::from_rows(&[[1]], 20).unwrap();
        let predicate = JoinPredicate::new(
            ColumnRef::new(0, 0, 0),
            ColumnRef::new(1, 0, 0),
            Comparison::Less,
        );

        assert!(matches!(
            Join::new(scan(&r, 0), scan(&r, 1), predicate, ParallelPolicy::default()),
            Err(JoinerError::UnsupportedJoinComparison(Comparison::Less, _))
        ));
    }

    #[test]
    fn test_empty_input() {
        let r = Relation::from_rows(&[[1]], 20).unwrap();
        let s = Relation::new(vec![vec![]], 20).unwrap();
        let predicate = JoinPredicate::equi(ColumnRef::new(0, 0, 0), ColumnRef::new(1, 1, 0));

        let mut join =
            Join::new(scan(&r, 0), scan(&s, 1), predicate, ParallelPolicy::fixed(8)).unwrap();
        join.require(ColumnRef::new(0, 0, 0)).unwrap();
        join.run().unwrap();

        assert_eq!(0, join.result().size());
        assert_eq!(vec![&[] as &[u64]], join.result().columns());
    }
}
