use itertools::Itertools;
use rayon::prelude::*;
use std::fmt::{Display, Formatter};

use crate::error::{JoinerError, JoinerResult};
use crate::operator::{check_runnable, DisplayFields, Operator, OperatorState, ResultSet};
use crate::query::ColumnRef;

/// Final answer of a query: the wrapping sum of every selected column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOutput {
    pub result_size: usize,
    pub checksums: Vec<u64>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.result_size == 0
    }
}

/// Space separated sums, or `NULL` for every column of an empty result.
impl Display for QueryOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "{}", self.checksums.iter().map(|_| "NULL").join(" "))
        } else {
            write!(f, "{}", self.checksums.iter().join(" "))
        }
    }
}

/// Root operator summing the selected columns of its input.
#[derive(Debug)]
pub struct Checksum<'a> {
    input: Box<Operator<'a>>,
    selections: Vec<ColumnRef>,
    checksums: Vec<u64>,
    state: OperatorState,
}

impl<'a> Checksum<'a> {
    /// Creates the checksum and requires every selected column from `input`.
    pub fn new(mut input: Operator<'a>, selections: Vec<ColumnRef>) -> JoinerResult<Self> {
        for column in &selections {
            if !input.require(*column)? {
                return Err(JoinerError::UnresolvedColumn(*column));
            }
        }
        Ok(Self {
            input: Box::new(input),
            selections,
            checksums: vec![],
            state: OperatorState::Required,
        })
    }

    pub fn input(&self) -> &Operator<'a> {
        &self.input
    }

    pub fn selections(&self) -> &[ColumnRef] {
        &self.selections
    }

    pub fn require(&mut self, column: ColumnRef) -> JoinerResult<bool> {
        check_runnable("Checksum", self.state)?;
        self.input.require(column)
    }

    pub fn run(&mut self) -> JoinerResult<()> {
        check_runnable("Checksum", self.state)?;
        self.input.run()?;

        let input = &self.input;
        self.checksums = self
            .selections
            .iter()
            .map(|column| {
                let values = input.column(input.resolve(*column)?);
                Ok(values
                    .par_iter()
                    .copied()
                    .reduce(|| 0, u64::wrapping_add))
            })
            .collect::<JoinerResult<Vec<_>>>()?;
        self.state = OperatorState::Executed;
        Ok(())
    }

    pub fn result(&self) -> &ResultSet<'a> {
        self.input.result()
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    /// Sums of the executed query.
    pub fn output(&self) -> JoinerResult<QueryOutput> {
        if self.state != OperatorState::Executed {
            return Err(JoinerError::InvalidOperatorState {
                operator: "Checksum",
                action: "output",
                state: self.state,
            });
        }
        Ok(QueryOutput {
            result_size: self.input.result_size(),
            checksums: self.checksums.clone(),
        })
    }
}

impl<'a> DisplayFields for Checksum<'a> {
    fn display(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("")
            .field(
                "selections",
                &format_args!("[{}]", self.selections.iter().join(", ")),
            )
            .finish()
    }
}
