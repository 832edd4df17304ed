#[cfg(feature = "web")]
mod sqlite;

#[cfg(feature = "web")]
pub use sqlite::SqliteBackend;

use std::collections::HashMap;

use geo_types::Geometry;

use crate::error::EcoError;
use crate::models::{RowFilter, RowSource, TreeRow, VecRowSource};
use crate::resolve::{OverrideMap, Region};

/// Source of instance data: tree rows, per-instance overrides, region
/// boundaries and the fixed-region shortcut.
///
/// Implementations are shared across request handlers, so they take `&self`
/// and must be `Send + Sync`; connection state, if any, is per call.
pub trait DataBackend: Send + Sync {
    /// The single region covering an instance, when one is configured.
    /// Instances spanning several regions return `None` and their trees go
    /// through spatial resolution instead.
    fn fixed_region_for_instance(&self, instance_id: i64) -> Result<Option<String>, EcoError>;

    /// The instance's boundary geometry, used to narrow the spatial scan to
    /// the regions it intersects and to derive a fixed region when exactly
    /// one intersects. `None` when no boundary is stored.
    fn instance_bounds(&self, instance_id: i64) -> Result<Option<Geometry<f64>>, EcoError>;

    /// Open a row source over an instance's trees, optionally narrowed by
    /// `filter`. When `with_location` is set each row carries the data
    /// needed to resolve its region; otherwise rows come back bare for a
    /// fixed-region pass.
    ///
    /// Sources pull rows lazily and hold at most a bounded batch in memory,
    /// so dropping one part-way through abandons the rest of the scan.
    fn rows_for_instance(
        &self,
        instance_id: i64,
        filter: &RowFilter,
        with_location: bool,
    ) -> Result<Box<dyn RowSource>, EcoError>;

    /// All growth-curve code overrides, across every instance.
    fn load_overrides(&self) -> Result<OverrideMap, EcoError>;

    /// Every region boundary.
    fn load_regions(&self) -> Result<Vec<Region>, EcoError>;
}

/// In-memory backend over prepared data. Backs the test suites and small
/// self-contained deployments that have no database.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    fixed_regions: HashMap<i64, String>,
    bounds: HashMap<i64, Geometry<f64>>,
    rows: HashMap<i64, Vec<TreeRow>>,
    overrides: OverrideMap,
    regions: Vec<Region>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_region(mut self, instance_id: i64, region: impl Into<String>) -> Self {
        self.fixed_regions.insert(instance_id, region.into());
        self
    }

    pub fn with_bounds(mut self, instance_id: i64, bounds: Geometry<f64>) -> Self {
        self.bounds.insert(instance_id, bounds);
        self
    }

    pub fn with_rows(mut self, instance_id: i64, rows: Vec<TreeRow>) -> Self {
        self.rows.insert(instance_id, rows);
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideMap) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = regions;
        self
    }
}

impl DataBackend for MemoryBackend {
    fn fixed_region_for_instance(&self, instance_id: i64) -> Result<Option<String>, EcoError> {
        Ok(self.fixed_regions.get(&instance_id).cloned())
    }

    fn instance_bounds(&self, instance_id: i64) -> Result<Option<Geometry<f64>>, EcoError> {
        Ok(self.bounds.get(&instance_id).cloned())
    }

    fn rows_for_instance(
        &self,
        instance_id: i64,
        _filter: &RowFilter,
        _with_location: bool,
    ) -> Result<Box<dyn RowSource>, EcoError> {
        let rows = self.rows.get(&instance_id).cloned().unwrap_or_default();
        Ok(Box::new(VecRowSource::new(rows)))
    }

    fn load_overrides(&self) -> Result<OverrideMap, EcoError> {
        Ok(self.overrides.clone())
    }

    fn load_regions(&self) -> Result<Vec<Region>, EcoError> {
        Ok(self.regions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_fixed_region() {
        let backend = MemoryBackend::new().with_fixed_region(1, "NoEastXXX");
        assert_eq!(
            backend.fixed_region_for_instance(1).unwrap().as_deref(),
            Some("NoEastXXX")
        );
        assert_eq!(backend.fixed_region_for_instance(2).unwrap(), None);
    }

    #[test]
    fn test_memory_backend_rows() {
        let rows = vec![TreeRow::WithoutRegion {
            id: 1,
            diameter_cm: 10.0,
            otmcode: "MASO".to_string(),
            species_id: 1,
        }];
        let backend = MemoryBackend::new().with_rows(5, rows);

        let mut source = backend
            .rows_for_instance(5, &RowFilter::default(), false)
            .unwrap();
        assert_eq!(source.next_row().unwrap().unwrap().id(), 1);
        assert!(source.next_row().unwrap().is_none());

        // Unknown instances just have no rows.
        let mut empty = backend
            .rows_for_instance(99, &RowFilter::default(), false)
            .unwrap();
        assert!(empty.next_row().unwrap().is_none());
    }

    #[test]
    fn test_memory_backend_instance_bounds() {
        let bounds = crate::resolve::parse_wkt("POLYGON((0 0,0 1,1 1,1 0,0 0))").unwrap();
        let backend = MemoryBackend::new().with_bounds(4, bounds);
        assert!(backend.instance_bounds(4).unwrap().is_some());
        assert!(backend.instance_bounds(5).unwrap().is_none());
    }

    #[test]
    fn test_memory_backend_regions_and_overrides() {
        let region = Region::from_wkt("R", "POLYGON((0 0,0 1,1 1,1 0,0 0))").unwrap();
        let backend = MemoryBackend::new().with_regions(vec![region]);
        assert_eq!(backend.load_regions().unwrap().len(), 1);
        assert!(backend.load_overrides().unwrap().is_empty());
    }
}
