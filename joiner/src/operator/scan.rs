use std::fmt::Formatter;

use crate::catalog::{Relation, RelationId};
use crate::error::{JoinerError, JoinerResult};
use crate::operator::{
    check_runnable, mark_required, ColumnData, DisplayFields, OperatorState, ResultSet,
};
use crate::query::{Binding, ColumnRef};

/// Exposes the columns of one binding without copying them.
#[derive(Debug)]
pub struct Scan<'a> {
    relation: &'a Relation,
    binding: Binding,
    relation_id: RelationId,
    required: Vec<ColumnRef>,
    result: ResultSet<'a>,
    state: OperatorState,
}

impl<'a> Scan<'a> {
    pub fn new(relation: &'a Relation, binding: Binding, relation_id: RelationId) -> Self {
        Self {
            relation,
            binding,
            relation_id,
            required: vec![],
            result: ResultSet::default(),
            state: OperatorState::Unplanned,
        }
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn relation_id(&self) -> RelationId {
        self.relation_id
    }

    pub fn require(&mut self, column: ColumnRef) -> JoinerResult<bool> {
        if column.binding != self.binding {
            return Ok(false);
        }
        base_column(self.relation, column)?;
        mark_required("Scan", &mut self.state)?;
        if !self.required.contains(&column) {
            self.required.push(column);
        }
        Ok(true)
    }

    pub fn run(&mut self) -> JoinerResult<()> {
        check_runnable("Scan", self.state)?;
        let mut result = ResultSet::new(self.relation.size());
        for column in &self.required {
            result.push(
                *column,
                ColumnData::Borrowed(base_column(self.relation, *column)?),
            );
        }
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

impl<'a> DisplayFields for Scan<'a> {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field("binding", &self.binding)
            .field("relation", &self.relation_id)
            .finish()
    }
}

/// Looks up the stored values of `column` in `relation`.
pub(crate) fn base_column(relation: &Relation, column: ColumnRef) -> JoinerResult<&[u64]> {
    relation
        .column(column.column_id)
        .ok_or(JoinerError::ColumnOutOfRange {
            column,
            relation_id: column.relation_id,
            num_columns: relation.num_columns(),
        })
}
