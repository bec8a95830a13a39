use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::ExecutionConfig;

/// Context for planning and executing queries. Includes access to catalog and tunables.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub catalog: Arc<Catalog>,
    pub config: ExecutionConfig,
}

impl ExecutionContext {
    pub fn new(catalog: Arc<Catalog>, config: ExecutionConfig) -> Self {
        Self { catalog, config }
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::new(Arc::new(catalog), ExecutionConfig::default())
    }
}
