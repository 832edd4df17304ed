use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::backend::DataBackend;
use crate::curves::{load_species_map, CurveStore};
use crate::engine::BenefitEngine;
use crate::error::EcoError;
use crate::resolve::{CodeResolver, OverrideMap, Region};

/// Name of the master species table inside the curve data directory.
pub const SPECIES_FILE: &str = "species.json";

/// One immutable, internally consistent view of all lookup data: curve
/// tables, the code resolver and region boundaries. Requests hold an `Arc`
/// to the snapshot they started with, so a concurrent reload never changes
/// data mid-request.
#[derive(Debug, Clone)]
pub struct EcoSnapshot {
    pub curves: CurveStore,
    pub resolver: CodeResolver,
    pub regions: Vec<Arc<Region>>,
}

impl EcoSnapshot {
    /// Load curves and the species table from a data directory. No
    /// overrides and no region boundaries; enough for fixed-region work.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, EcoError> {
        let data_dir = data_dir.as_ref();
        let curves = CurveStore::load_dir(data_dir)?;
        let species = load_species_map(data_dir.join(SPECIES_FILE))?;
        info!(
            regions = curves.len(),
            data_dir = %data_dir.display(),
            "loaded curve data"
        );
        Ok(Self {
            curves,
            resolver: CodeResolver::new(species, OverrideMap::new()),
            regions: Vec::new(),
        })
    }

    /// Load the full snapshot: file data plus overrides and region
    /// boundaries from the backend.
    pub fn load_with_backend(
        data_dir: impl AsRef<Path>,
        backend: &dyn DataBackend,
    ) -> Result<Self, EcoError> {
        let mut snapshot = Self::load(data_dir)?;
        let overrides = backend.load_overrides()?;
        let species = snapshot.resolver.species().clone();
        snapshot.resolver = CodeResolver::new(species, overrides);
        snapshot.regions = backend.load_regions()?.into_iter().map(Arc::new).collect();
        Ok(snapshot)
    }

    /// An engine borrowing this snapshot's tables.
    pub fn engine(&self) -> BenefitEngine<'_> {
        BenefitEngine::new(&self.curves, &self.resolver)
    }
}

/// Shared handle to the current snapshot, swapped atomically on reload.
/// Readers clone the inner `Arc` and never block each other; the write
/// lock is held only for the pointer swap.
pub struct EcoCache {
    inner: RwLock<Arc<EcoSnapshot>>,
}

impl EcoCache {
    pub fn new(snapshot: EcoSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current snapshot. Holds the lock only long enough to clone the
    /// pointer.
    pub fn snapshot(&self) -> Arc<EcoSnapshot> {
        self.inner.read().expect("cache lock poisoned").clone()
    }

    /// Swap in a freshly built snapshot. In-flight requests keep the one
    /// they started with.
    pub fn replace(&self, snapshot: EcoSnapshot) {
        let mut guard = self.inner.write().expect("cache lock poisoned");
        *guard = Arc::new(snapshot);
        info!("cache snapshot replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::Factor;
    use std::io::Write;

    fn write_data_dir(dir: &Path) {
        for factor in Factor::ALL {
            let path = dir.join(format!("output__NoEastXXX__{}.csv", factor));
            let mut f = std::fs::File::create(path).unwrap();
            writeln!(f, ",1.0,3.0").unwrap();
            writeln!(f, "BDS OTHER,4.0,6.0").unwrap();
        }
        std::fs::write(
            dir.join(SPECIES_FILE),
            r#"{"NoEastXXX": {"MASO": "BDS OTHER"}}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_snapshot_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());

        let snapshot = EcoSnapshot::load(dir.path()).unwrap();
        assert!(snapshot.curves.has_region("NoEastXXX"));
        assert!(snapshot.regions.is_empty());

        let engine = snapshot.engine();
        let benefits = engine
            .benefits_for_tree("NoEastXXX", "BDS OTHER", 2.0)
            .unwrap();
        assert!((benefits.get(Factor::NaturalGas) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_load_fails_without_species_file() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());
        std::fs::remove_file(dir.path().join(SPECIES_FILE)).unwrap();
        assert!(EcoSnapshot::load(dir.path()).is_err());
    }

    #[test]
    fn test_snapshot_with_backend_pulls_overrides_and_regions() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());

        let mut by_species = std::collections::HashMap::new();
        by_species.insert(7i64, "BDS OTHER".to_string());
        let mut by_region = std::collections::HashMap::new();
        by_region.insert("NoEastXXX".to_string(), by_species);
        let mut overrides = OverrideMap::new();
        overrides.insert(1, by_region);

        let backend = MemoryBackend::new()
            .with_overrides(overrides)
            .with_regions(vec![Region::from_wkt(
                "NoEastXXX",
                "POLYGON((0 0,0 1,1 1,1 0,0 0))",
            )
            .unwrap()]);

        let snapshot = EcoSnapshot::load_with_backend(dir.path(), &backend).unwrap();
        assert_eq!(snapshot.regions.len(), 1);
        // Overrides flow into the resolver.
        assert_eq!(
            snapshot
                .resolver
                .resolve("ANY", 7, "NoEastXXX", 1)
                .unwrap(),
            "BDS OTHER"
        );
    }

    #[test]
    fn test_cache_replace_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_data_dir(dir.path());

        let cache = EcoCache::new(EcoSnapshot::load(dir.path()).unwrap());
        let before = cache.snapshot();

        cache.replace(EcoSnapshot::load(dir.path()).unwrap());
        let after = cache.snapshot();

        assert!(!Arc::ptr_eq(&before, &after));
        // The old snapshot is still fully usable by whoever holds it.
        assert!(before.curves.has_region("NoEastXXX"));
    }
}
