//! Relation store.
//!
//! Relations are loaded once before the first query and only read afterwards, so the whole
//! [`Catalog`] is shared between query workers behind an `Arc` without any locking.

use log::debug;

use crate::error::{JoinerError, JoinerResult};
use crate::stat::Histogram;

pub type RelationId = usize;

/// Immutable columnar relation with one histogram per column.
#[derive(Debug)]
pub struct Relation {
    size: usize,
    columns: Vec<Vec<u64>>,
    histograms: Vec<Histogram>,
}

impl Relation {
    /// Creates a relation from column-major data. All columns must have the same length.
    pub fn new(columns: Vec<Vec<u64>>, histogram_buckets: usize) -> JoinerResult<Self> {
        let size = columns.first().map(Vec::len).unwrap_or_default();
        if let Some((idx, column)) = columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() != size)
        {
            return Err(JoinerError::InvalidRelation(format!(
                "column {} has {} rows, expected {}",
                idx,
                column.len(),
                size
            )));
        }

        let histograms = columns
            .iter()
            .map(|column| Histogram::from_column(column, histogram_buckets))
            .collect();

        Ok(Self {
            size,
            columns,
            histograms,
        })
    }

    /// Creates a relation from rows, handy for small fixtures.
    pub fn from_rows<R: AsRef<[u64]>>(
        rows: &[R],
        histogram_buckets: usize,
    ) -> JoinerResult<Self> {
        let num_columns = rows.first().map(|r| r.as_ref().len()).unwrap_or_default();
        let mut columns = vec![Vec::with_capacity(rows.len()); num_columns];
        for row in rows {
            let row = row.as_ref();
            if row.len() != num_columns {
                return Err(JoinerError::InvalidRelation(format!(
                    "row has {} values, expected {}",
                    row.len(),
                    num_columns
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(*value);
            }
        }
        Self::new(columns, histogram_buckets)
    }

    /// Number of tuples.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Vec<u64>] {
        &self.columns
    }

    pub fn column(&self, column_id: usize) -> Option<&[u64]> {
        self.columns.get(column_id).map(Vec::as_slice)
    }

    pub fn histogram(&self, column_id: usize) -> Option<&Histogram> {
        self.histograms.get(column_id)
    }

    pub fn histograms(&self) -> &[Histogram] {
        &self.histograms
    }
}

/// All relations available to queries, addressed by load order.
#[derive(Debug, Default)]
pub struct Catalog {
    relations: Vec<Relation>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_relation(&mut self, relation: Relation) -> RelationId {
        let relation_id = self.relations.len();
        debug!(
            "Registered relation {} with {} rows and {} columns",
            relation_id,
            relation.size(),
            relation.num_columns()
        );
        self.relations.push(relation);
        relation_id
    }

    pub fn relation(&self, relation_id: RelationId) -> JoinerResult<&Relation> {
        self.relations
            .get(relation_id)
            .ok_or(JoinerError::RelationNotFound(relation_id))
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl FromIterator<Relation> for Catalog {
    fn from_iter<T: IntoIterator<Item = Relation>>(iter: T) -> Self {
        Self {
            relations: iter.into_iter().collect(),
        }
    }
}
