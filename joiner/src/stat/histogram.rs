use itertools::Itertools;

/// Default number of buckets per column.
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 20;

/// Equal-width histogram of one column.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    buckets: Vec<u64>,
    min_val: u64,
    max_val: u64,
    /// Never zero, a single valued column still gets width 1.
    bucket_width: u64,
    n_tups: u64,
}

impl Histogram {
    pub fn from_column(values: &[u64], num_buckets: usize) -> Self {
        let num_buckets = num_buckets.max(1);
        let (min_val, max_val) = match values.iter().minmax().into_option() {
            Some((min, max)) => (*min, *max),
            None => {
                return Self {
                    buckets: vec![0; num_buckets],
                    min_val: 0,
                    max_val: 0,
                    bucket_width: 1,
                    n_tups: 0,
                }
            }
        };

        // The span can be 2^64 for a column holding both 0 and u64::MAX.
        let span = (max_val - min_val) as u128 + 1;
        let bucket_width = ((span / num_buckets as u128) as u64).max(1);

        let mut buckets = vec![0u64; num_buckets];
        for value in values {
            let bucket = (((value - min_val) / bucket_width) as usize).min(num_buckets - 1);
            buckets[bucket] += 1;
        }

        Self {
            buckets,
            min_val,
            max_val,
            bucket_width,
            n_tups: values.len() as u64,
        }
    }

    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn min_val(&self) -> u64 {
        self.min_val
    }

    pub fn max_val(&self) -> u64 {
        self.max_val
    }

    pub fn bucket_width(&self) -> u64 {
        self.bucket_width
    }

    pub fn n_tups(&self) -> u64 {
        self.n_tups
    }

    pub fn is_empty(&self) -> bool {
        self.n_tups == 0
    }

    /// Index of the bucket `value` falls into. Caller guarantees `value >= min_val`.
    pub(crate) fn bucket_of(&self, value: u64) -> usize {
        (((value - self.min_val) / self.bucket_width) as usize).min(self.num_buckets() - 1)
    }

    /// Smallest value covered by `bucket`.
    pub(crate) fn bucket_min(&self, bucket: usize) -> u64 {
        self.min_val
            .saturating_add(self.bucket_width.saturating_mul(bucket as u64))
    }

    /// Number of distinct values `bucket` covers. The last bucket absorbs the remainder up to
    /// `max_val`, so it can be wider than `bucket_width`.
    /// Estimates interpolate over this span instead of the overflow bucket's nominal width.
    pub(crate) fn bucket_span(&self, bucket: usize) -> f64 {
        if bucket + 1 == self.num_buckets() {
            (self.max_val.saturating_sub(self.bucket_min(bucket)) as f64 + 1.0)
                .max(self.bucket_width as f64)
        } else {
            self.bucket_width as f64
        }
    }
}
