//! Column statistics used to estimate filter selectivity.
//!
//! Every loaded column gets an equal-width [`Histogram`] over `[min, max]`. The estimator in
//! [`selectivity`] assumes values are uniformly spread inside one bucket.

mod histogram;
pub use histogram::*;
mod selectivity;
pub use selectivity::*;
