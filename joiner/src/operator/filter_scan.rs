use itertools::Itertools;
use log::debug;
use smallvec::SmallVec;
use std::fmt::Formatter;

use crate::catalog::{Relation, RelationId};
use crate::config::ParallelPolicy;
use crate::error::JoinerResult;
use crate::operator::{
    base_column, check_runnable, mark_required, ColumnData, DisplayFields, OperatorState,
    ResultSet,
};
use crate::parallel::{filter_rows, gather, ScatterLayout};
use crate::query::{Binding, ColumnRef, FilterPredicate};

/// Scans one binding and keeps only the rows satisfying all of its filters.
#[derive(Debug)]
pub struct FilterScan<'a> {
    relation: &'a Relation,
    binding: Binding,
    relation_id: RelationId,
    filters: SmallVec<[FilterPredicate; 4]>,
    policy: ParallelPolicy,
    required: Vec<ColumnRef>,
    result: ResultSet<'a>,
    state: OperatorState,
}

impl<'a> FilterScan<'a> {
    pub fn new<I: IntoIterator<Item = FilterPredicate>>(
        relation: &'a Relation,
        binding: Binding,
        relation_id: RelationId,
        filters: I,
        policy: ParallelPolicy,
    ) -> JoinerResult<Self> {
        let filters: SmallVec<[FilterPredicate; 4]> = filters.into_iter().collect();
        for filter in &filters {
            base_column(relation, filter.column)?;
        }
        Ok(Self {
            relation,
            binding,
            relation_id,
            filters,
            policy,
            required: vec![],
            result: ResultSet::default(),
            state: OperatorState::Unplanned,
        })
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn require(&mut self, column: ColumnRef) -> JoinerResult<bool> {
        if column.binding != self.binding {
            return Ok(false);
        }
        base_column(self.relation, column)?;
        mark_required("FilterScan", &mut self.state)?;
        if !self.required.contains(&column) {
            self.required.push(column);
        }
        Ok(true)
    }

    pub fn run(&mut self) -> JoinerResult<()> {
        check_runnable("FilterScan", self.state)?;
        let filters = self
            .filters
            .iter()
            .map(|filter| Ok((base_column(self.relation, filter.column)?, filter)))
            .collect::<JoinerResult<Vec<_>>>()?;

        let workers = self.policy.workers_for(self.relation.size());
        let kept = filter_rows(self.relation.size(), workers, |row| {
            filters
                .iter()
                .all(|(values, filter)| filter.matches(values[row]))
        });
        let layout = ScatterLayout::from_lengths(kept.iter().map(Vec::len));
        let rows = kept.iter().map(Vec::as_slice).collect_vec();

        let mut result = ResultSet::new(layout.total());
        for column in &self.required {
            let values = base_column(self.relation, *column)?;
            result.push(*column, ColumnData::Owned(gather(values, &layout, &rows)));
        }
        debug!(
            "FilterScan on binding {} kept {} of {} rows with {} workers",
            self.binding,
            layout.total(),
            self.relation.size(),
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

impl<'a> DisplayFields for FilterScan<'a> {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("binding", &self.binding)
            .field("relation", &self.relation_id)
            .field(
                "filters",
                &format_args!("[{}]", self.filters.iter().join(", ")),
            )
            .finish()
    }
}
