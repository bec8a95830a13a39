use rayon::prelude::*;

/// Output layout of a parallel merge: partition `i` owns `offset(i)..offset(i) + len(i)`.
///
/// Offsets are the prefix sums of the partition lengths, so every partition can write its
/// region of the shared buffer concurrently with the others.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScatterLayout {
    offsets: Vec<usize>,
    total: usize,
}

impl ScatterLayout {
    pub fn from_lengths<I: IntoIterator<Item = usize>>(lengths: I) -> Self {
        let mut total = 0;
        let offsets = lengths
            .into_iter()
            .map(|len| {
                let offset = total;
                total += len;
                offset
            })
            .collect();
        Self { offsets, total }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_parts(&self) -> usize {
        self.offsets.len()
    }

    pub fn offset(&self, part: usize) -> usize {
        self.offsets[part]
    }

    pub fn len(&self, part: usize) -> usize {
        self.offsets
            .get(part + 1)
            .copied()
            .unwrap_or(self.total)
            - self.offsets[part]
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Splits `out` into the disjoint regions of each partition.
    pub fn split_mut<'b, T>(&self, mut out: &'b mut [T]) -> Vec<&'b mut [T]> {
        debug_assert_eq!(self.total, out.len());
        let mut regions = Vec::with_capacity(self.num_parts());
        for part in 0..self.num_parts() {
            let (region, rest) = std::mem::take(&mut out).split_at_mut(self.len(part));
            regions.push(region);
            out = rest;
        }
        regions
    }

    /// Allocates the merged buffer and lets every partition fill its own region in parallel.
    pub fn scatter<T, F>(&self, fill: F) -> Vec<T>
    where
        T: Default + Clone + Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        let mut out = vec![T::default(); self.total];
        self.split_mut(&mut out)
            .into_par_iter()
            .enumerate()
            .for_each(|(part, region)| fill(part, region));
        out
    }
}
