use thiserror::Error;

use crate::catalog::RelationId;
use crate::query::{Binding, ColumnRef, Comparison};

pub type JoinerResult<T> = Result<T, JoinerError>;

#[derive(Error, Debug)]
pub enum JoinerError {
    #[error("Relation with id {0} does not exist")]
    RelationNotFound(RelationId),

    #[error("Join predicates do not connect all bindings, components: {components:?}")]
    DisconnectedQueryGraph { components: Vec<Vec<Binding>> },

    #[error("Malformed relation file {path}: {reason}")]
    MalformedRelationFile { path: String, reason: String },

    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    #[error("No operator provides column {0}")]
    UnresolvedColumn(ColumnRef),

    #[error("Column {column} out of range, relation {relation_id} has {num_columns} columns")]
    ColumnOutOfRange {
        column: ColumnRef,
        relation_id: RelationId,
        num_columns: usize,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Hash join can't evaluate {0} predicate {1}")]
    UnsupportedJoinComparison(Comparison, String),

    #[error("Operator {operator} can't {action} in state {state:?}")]
    InvalidOperatorState {
        operator: &'static str,
        action: &'static str,
        state: crate::operator::OperatorState,
    },

    #[error("Query worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
