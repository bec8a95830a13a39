use std::collections::HashMap;

use rayon::prelude::*;
use smallvec::SmallVec;

/// Row pairs matched by one partition, `build[i]` joins with `probe[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchedRows {
    pub build: Vec<usize>,
    pub probe: Vec<usize>,
}

impl MatchedRows {
    pub fn len(&self) -> usize {
        self.build.len()
    }

    pub fn is_empty(&self) -> bool {
        self.build.is_empty()
    }
}

/// Equi-joins `build_keys` with `probe_keys`.
///
/// With more than one worker both sides are partitioned by `key mod workers`. Each partition
/// then builds its own hash table from its build rows and probes it with its probe rows. Within
/// a partition, matches come out in probe order and, for one probe row, in build order.
pub fn hash_join(build_keys: &[u64], probe_keys: &[u64], workers: usize) -> Vec<MatchedRows> {
    if build_keys.is_empty() || probe_keys.is_empty() {
        return vec![];
    }
    if workers <= 1 {
        let table = build_table(build_keys, 0..build_keys.len());
        return vec![probe_table(&table, probe_keys, 0..probe_keys.len())];
    }

    let build_parts = partition_by_key(build_keys, workers);
    let probe_parts = partition_by_key(probe_keys, workers);
    build_parts
        .into_par_iter()
        .zip(probe_parts)
        .map(|(build_rows, probe_rows)| {
            let table = build_table(build_keys, build_rows);
            probe_table(&table, probe_keys, probe_rows)
        })
        .collect()
}

type HashTable = HashMap<u64, SmallVec<[usize; 2]>>;

fn build_table<I: IntoIterator<Item = usize>>(keys: &[u64], rows: I) -> HashTable {
    let mut table = HashTable::new();
    for row in rows {
        table.entry(keys[row]).or_default().push(row);
    }
    table
}

fn probe_table<I: IntoIterator<Item = usize>>(
    table: &HashTable,
    keys: &[u64],
    rows: I,
) -> MatchedRows {
    let mut matched = MatchedRows::default();
    for row in rows {
        if let Some(build_rows) = table.get(&keys[row]) {
            for build_row in build_rows {
                matched.build.push(*build_row);
                matched.probe.push(row);
            }
        }
    }
    matched
}

/// Splits row indices into `parts` lists by `key mod parts`, keeping the original row order
/// inside every list.
pub fn partition_by_key(keys: &[u64], parts: usize) -> Vec<Vec<usize>> {
    let parts = parts.max(1);
    let chunk_size = ((keys.len() + parts - 1) / parts).max(1);
    let local: Vec<Vec<Vec<usize>>> = keys
        .par_chunks(chunk_size)
        .enumerate()
        .map(|(chunk_idx, chunk)| {
            let base = chunk_idx * chunk_size;
            let mut buckets = vec![Vec::new(); parts];
            for (offset, key) in chunk.iter().enumerate() {
                buckets[(key % parts as u64) as usize].push(base + offset);
            }
            buckets
        })
        .collect();

    (0..parts)
        .into_par_iter()
        .map(|part| {
            local
                .iter()
                .flat_map(|buckets| buckets[part].iter().copied())
                .collect()
        })
        .collect()
}
