//! Partitioned parallel primitives behind the materializing operators.
//!
//! All of them follow the same shape: split the input into independent partitions, let every
//! worker produce row indices into its own local buffer, then merge by giving each partition a
//! disjoint slice of the output (see [`ScatterLayout`]). Workers never share a hash table or a
//! result buffer, so no locking is involved.

mod scatter;
pub use scatter::*;
mod hash_join;
pub use hash_join::*;
mod filter;
pub use filter::*;

/// Copies `column[row]` for every row of every partition into one new column, partition order
/// first and row order within a partition second.
pub fn gather(column: &[u64], layout: &ScatterLayout, rows: &[&[usize]]) -> Vec<u64> {
    layout.scatter(|part, region: &mut [u64]| {
        for (slot, row) in region.iter_mut().zip(rows[part]) {
            *slot = column[*row];
        }
    })
}
