use crate::catalog::{Catalog, Relation};
use crate::stat::DEFAULT_HISTOGRAM_BUCKETS;

/// Builds a catalog from row-major relations, relation ids follow the order given.
pub fn catalog_from_rows(relations: Vec<Vec<Vec<u64>>>) -> Catalog {
    relations
        .iter()
        .map(|rows| Relation::from_rows(rows, DEFAULT_HISTOGRAM_BUCKETS).unwrap())
        .collect()
}

/// Relation whose column `i` holds `f(row, i)`.
pub fn generated_relation<F>(rows: usize, columns: usize, f: F) -> Relation
where
    F: Fn(u64, usize) -> u64,
{
    let columns = (0..columns)
        .map(|column| (0..rows as u64).map(|row| f(row, column)).collect())
        .collect();
    Relation::new(columns, DEFAULT_HISTOGRAM_BUCKETS).unwrap()
}
