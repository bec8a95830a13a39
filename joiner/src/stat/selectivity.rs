use derive_more::{Add, AddAssign, Sub, SubAssign, Sum};

use crate::query::Comparison;
use crate::stat::Histogram;

pub const NONE: Selectivity = Selectivity(0.0);
pub const ALL: Selectivity = Selectivity(1.0);

/// Fraction of rows satisfying a predicate, in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Add, Sub, Sum, AddAssign, SubAssign)]
pub struct Selectivity(f64);

impl From<f64> for Selectivity {
    fn from(s: f64) -> Self {
        Selectivity(s)
    }
}

impl Selectivity {
    pub fn value(self) -> f64 {
        self.0
    }

    /// Selectivity of two independent predicates applied together.
    pub fn and(self, other: Selectivity) -> Selectivity {
        Selectivity(self.0 * other.0)
    }
}

/// Estimates the fraction of rows in `histogram`'s column satisfying `column <op> constant`.
///
/// `Less`, `Equal` and `Greater` always sum to one for the same constant: `Greater` is derived
/// from the other two.
pub fn estimate_selectivity(histogram: &Histogram, op: Comparison, constant: u64) -> Selectivity {
    match op {
        Comparison::Equal => estimate_equal(histogram, constant),
        Comparison::Less => estimate_less(histogram, constant),
        Comparison::Greater => {
            ALL - estimate_less(histogram, constant) - estimate_equal(histogram, constant)
        }
    }
}

fn estimate_equal(histogram: &Histogram, constant: u64) -> Selectivity {
    if histogram.is_empty()
        || constant < histogram.min_val()
        || constant > histogram.max_val()
    {
        return NONE;
    }

    let bucket = histogram.bucket_of(constant);
    let n_tups = histogram.n_tups() as f64;
    Selectivity(histogram.buckets()[bucket] as f64 / histogram.bucket_span(bucket) / n_tups)
}

fn estimate_less(histogram: &Histogram, constant: u64) -> Selectivity {
    if histogram.is_empty() || constant < histogram.min_val() {
        return NONE;
    }
    if constant > histogram.max_val() {
        return ALL;
    }

    let bucket = histogram.bucket_of(constant);
    let n_tups = histogram.n_tups() as f64;
    let proportion_less_than = (constant - histogram.bucket_min(bucket)) as f64
        / histogram.bucket_span(bucket);

    let preceding: u64 = histogram.buckets()[..bucket].iter().sum();
    Selectivity(
        proportion_less_than * (histogram.buckets()[bucket] as f64 / n_tups)
            + preceding as f64 / n_tups,
    )
}
