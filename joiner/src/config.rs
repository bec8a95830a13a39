//! Execution tunables.
//!
//! Every operator derives its worker count from the immutable policy it is handed, so queries
//! running side by side never see each other's budget.

use serde::Deserialize;

use crate::stat::DEFAULT_HISTOGRAM_BUCKETS;

lazy_static! {
    /// Size of the global rayon pool, used as default upper bound of workers.
    pub static ref AVAILABLE_WORKERS: usize = rayon::current_num_threads();
}

/// Decides how many partitions an operator splits its input into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParallelPolicy {
    /// Inputs with fewer rows are processed by a single worker.
    pub threshold: usize,
    /// Rows each additional worker should get at least.
    pub rows_per_worker: usize,
    pub max_workers: usize,
}

impl ParallelPolicy {
    pub fn new(threshold: usize, rows_per_worker: usize, max_workers: usize) -> Self {
        Self {
            threshold,
            rows_per_worker,
            max_workers,
        }
    }

    /// Runs everything on one worker.
    pub fn sequential() -> Self {
        Self::new(usize::MAX, usize::MAX, 1)
    }

    /// Uses exactly `workers` partitions whenever there is at least one row per partition.
    pub fn fixed(workers: usize) -> Self {
        Self::new(0, 1, workers)
    }

    /// `min(max_workers, max(1, rows / rows_per_worker))`, or 1 below the threshold.
    pub fn workers_for(&self, rows: usize) -> usize {
        if rows < self.threshold {
            return 1;
        }
        (rows / self.rows_per_worker.max(1)).clamp(1, self.max_workers.max(1))
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self::new(10_000, 10_000, *AVAILABLE_WORKERS)
    }
}

/// How the planner orders join predicates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderingStrategy {
    /// Score predicates by the kind of filters touching their bindings.
    #[default]
    FilterKind,
    /// Order predicates by estimated filter selectivity from histograms.
    Selectivity,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub join: ParallelPolicy,
    pub self_join: ParallelPolicy,
    pub filter_scan: ParallelPolicy,
    pub histogram_buckets: usize,
    pub ordering: OrderingStrategy,
    /// Threads running queries of one batch, `None` means rayon's default.
    pub batch_workers: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            join: ParallelPolicy::default(),
            self_join: ParallelPolicy::new(1_000, 1_000, *AVAILABLE_WORKERS),
            filter_scan: ParallelPolicy::new(1_000, 1_000, *AVAILABLE_WORKERS),
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            ordering: OrderingStrategy::default(),
            batch_workers: None,
        }
    }
}

impl ExecutionConfig {
    /// Forces every parallel operator to use exactly `workers` partitions.
    pub fn with_fixed_workers(mut self, workers: usize) -> Self {
        self.join = ParallelPolicy::fixed(workers);
        self.self_join = ParallelPolicy::fixed(workers);
        self.filter_scan = ParallelPolicy::fixed(workers);
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingStrategy) -> Self {
        self.ordering = ordering;
        self
    }
}
