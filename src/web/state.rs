use std::sync::Arc;

use crate::backend::DataBackend;
use crate::cache::{EcoCache, EcoSnapshot};
use crate::config::Config;
use crate::error::EcoError;

/// Shared server state: the snapshot cache, the data backend it is rebuilt
/// from, and the config pointing at the curve data on disk.
pub struct AppState {
    pub cache: EcoCache,
    pub backend: Arc<dyn DataBackend>,
    pub config: Config,
}

impl AppState {
    /// Build the initial snapshot and wrap it in a cache. Fails fast when
    /// the curve data or backend is unusable, so a misconfigured server
    /// never starts serving.
    pub fn new(config: Config, backend: Arc<dyn DataBackend>) -> Result<Self, EcoError> {
        let snapshot = EcoSnapshot::load_with_backend(&config.data_dir, backend.as_ref())?;
        Ok(Self {
            cache: EcoCache::new(snapshot),
            backend,
            config,
        })
    }

    /// Rebuild the snapshot from scratch and swap it in. On failure the
    /// previous snapshot stays live.
    pub fn rebuild(&self) -> Result<(), EcoError> {
        let snapshot =
            EcoSnapshot::load_with_backend(&self.config.data_dir, self.backend.as_ref())?;
        self.cache.replace(snapshot);
        Ok(())
    }
}
