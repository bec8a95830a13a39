use crate::error::{JoinerError, JoinerResult};
use crate::operator::{Operator, QueryOutput};

pub mod explain;

/// Executable operator tree of one query, rooted at a checksum.
#[derive(Debug)]
pub struct QueryPlan<'a> {
    root: Operator<'a>,
}

impl<'a> QueryPlan<'a> {
    pub fn new(root: Operator<'a>) -> JoinerResult<Self> {
        if root.as_checksum().is_none() {
            return Err(JoinerError::InvalidQuery(format!(
                "plan root must be a checksum, got {}",
                root.as_ref()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Operator<'a> {
        &self.root
    }

    /// Runs the whole tree and returns the checksums.
    pub fn execute(mut self) -> JoinerResult<QueryOutput> {
        self.root.run()?;
        match &self.root {
            Operator::Checksum(checksum) => checksum.output(),
            other => Err(JoinerError::InvalidQuery(format!(
                "plan root must be a checksum, got {}",
                other.as_ref()
            ))),
        }
    }
}
