//! Structured form of one join query.
//!
//! A query references relations through bindings, e.g. the query `3 0 3|...` binds relation 3
//! twice (bindings 0 and 2) and relation 0 once (binding 1). Every column reference carries both
//! the binding and the relation id so operators never need to look the binding up again.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};

use crate::catalog::RelationId;
use crate::error::{JoinerError, JoinerResult};
use crate::stat::Selectivity;

/// Alias index of a relation inside one query.
pub type Binding = usize;

/// Identifies a column uniquely within a query.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ColumnRef {
    pub binding: Binding,
    pub relation_id: RelationId,
    pub column_id: usize,
}

impl ColumnRef {
    pub fn new(binding: Binding, relation_id: RelationId, column_id: usize) -> Self {
        Self {
            binding,
            relation_id,
            column_id,
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.binding, self.column_id)
    }
}

#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, AsRefStr, StrumDisplay, EnumString,
)]
pub enum Comparison {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
}

impl Comparison {
    pub fn evaluate(self, left: u64, right: u64) -> bool {
        match self {
            Comparison::Equal => left == right,
            Comparison::Less => left < right,
            Comparison::Greater => left > right,
        }
    }

    /// Comparison with both operands swapped, `a < b` becomes `b > a`.
    pub fn mirror(self) -> Self {
        match self {
            Comparison::Equal => Comparison::Equal,
            Comparison::Less => Comparison::Greater,
            Comparison::Greater => Comparison::Less,
        }
    }
}

/// Predicate between two columns of (possibly) different bindings.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct JoinPredicate {
    pub left: ColumnRef,
    pub right: ColumnRef,
    pub comparison: Comparison,
}

impl JoinPredicate {
    pub fn new(left: ColumnRef, right: ColumnRef, comparison: Comparison) -> Self {
        Self {
            left,
            right,
            comparison,
        }
    }

    pub fn equi(left: ColumnRef, right: ColumnRef) -> Self {
        Self::new(left, right, Comparison::Equal)
    }

    /// Same predicate with sides exchanged.
    pub fn swapped(&self) -> Self {
        Self::new(self.right, self.left, self.comparison.mirror())
    }

    pub fn touches(&self, binding: Binding) -> bool {
        self.left.binding == binding || self.right.binding == binding
    }
}

impl Display for JoinPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.left, self.comparison, self.right)
    }
}

/// Predicate between one column and a constant.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FilterPredicate {
    pub column: ColumnRef,
    pub comparison: Comparison,
    pub constant: u64,
    /// Histogram estimate, filled in during planning.
    pub selectivity: Option<Selectivity>,
}

impl FilterPredicate {
    pub fn new(column: ColumnRef, comparison: Comparison, constant: u64) -> Self {
        Self {
            column,
            comparison,
            constant,
            selectivity: None,
        }
    }

    pub fn matches(&self, value: u64) -> bool {
        self.comparison.evaluate(value, self.constant)
    }
}

impl Display for FilterPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.column, self.comparison, self.constant)
    }
}

/// One parsed query: bindings, join predicates, filters and the columns to checksum.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryInfo {
    relation_ids: Vec<RelationId>,
    predicates: Vec<JoinPredicate>,
    filters: Vec<FilterPredicate>,
    selections: Vec<ColumnRef>,
}

impl QueryInfo {
    pub fn new(
        relation_ids: Vec<RelationId>,
        predicates: Vec<JoinPredicate>,
        filters: Vec<FilterPredicate>,
        selections: Vec<ColumnRef>,
    ) -> JoinerResult<Self> {
        let query = Self {
            relation_ids,
            predicates,
            filters,
            selections,
        };
        query.validate()?;
        Ok(query)
    }

    fn validate(&self) -> JoinerResult<()> {
        if self.relation_ids.is_empty() {
            return Err(JoinerError::InvalidQuery("query binds no relation".to_string()));
        }
        if self.selections.is_empty() {
            return Err(JoinerError::InvalidQuery("query selects no column".to_string()));
        }

        let columns = self
            .predicates
            .iter()
            .flat_map(|p| [p.left, p.right])
            .chain(self.filters.iter().map(|f| f.column))
            .chain(self.selections.iter().copied());
        for column in columns {
            match self.relation_ids.get(column.binding) {
                Some(relation_id) if *relation_id == column.relation_id => {}
                Some(relation_id) => {
                    return Err(JoinerError::InvalidQuery(format!(
                        "column {} refers to relation {}, but binding {} is relation {}",
                        column, column.relation_id, column.binding, relation_id
                    )))
                }
                None => {
                    return Err(JoinerError::InvalidQuery(format!(
                        "column {} uses unknown binding {}",
                        column, column.binding
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn relation_ids(&self) -> &[RelationId] {
        &self.relation_ids
    }

    pub fn predicates(&self) -> &[JoinPredicate] {
        &self.predicates
    }

    pub fn filters(&self) -> &[FilterPredicate] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [FilterPredicate] {
        &mut self.filters
    }

    pub fn selections(&self) -> &[ColumnRef] {
        &self.selections
    }

    pub fn filters_on(&self, binding: Binding) -> impl Iterator<Item = &FilterPredicate> {
        self.filters
            .iter()
            .filter(move |f| f.column.binding == binding)
    }

    /// Builds the column reference `binding.column_id`.
    pub fn column(&self, binding: Binding, column_id: usize) -> JoinerResult<ColumnRef> {
        self.relation_ids
            .get(binding)
            .map(|relation_id| ColumnRef::new(binding, *relation_id, column_id))
            .ok_or_else(|| {
                JoinerError::InvalidQuery(format!("unknown binding {}", binding))
            })
    }
}

/// Renders the query in the `relations|predicates|selections` text format.
impl Display for QueryInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let predicates = self
            .predicates
            .iter()
            .map(|p| p.to_string())
            .chain(self.filters.iter().map(|p| p.to_string()))
            .join("&");
        write!(
            f,
            "{}|{}|{}",
            self.relation_ids.iter().join(" "),
            predicates,
            self.selections.iter().join(" ")
        )
    }
}
