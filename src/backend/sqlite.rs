use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use geo_types::Geometry;
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::debug;

use crate::error::EcoError;
use crate::models::{RowFilter, RowLocation, RowSource, TreeRow, CENTIMETERS_PER_INCH};
use crate::resolve::{parse_wkt, OverrideMap, Region};

use super::DataBackend;

/// Rows fetched per batch. Keyset pagination on the tree id keeps every
/// fetch an indexed range scan, so batch size only bounds memory.
const ROW_BATCH: usize = 256;

/// SQLite-backed instance data. A connection is opened per call, which
/// keeps the backend `Send + Sync` without a pool; load paths run rarely
/// and row queries amortize the open over the whole result set.
///
/// Stored diameters are in inches and converted at extraction, so
/// everything past this boundary works in centimeters.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, EcoError> {
        Ok(Connection::open(&self.path)?)
    }
}

impl DataBackend for SqliteBackend {
    fn fixed_region_for_instance(&self, instance_id: i64) -> Result<Option<String>, EcoError> {
        let conn = self.open()?;
        let mut stmt =
            conn.prepare("SELECT itree_region_default FROM treemap_instance WHERE id = ?")?;
        let mut rows = stmt.query([instance_id])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let region: Option<String> = row.get(0)?;
        // An empty default means the instance spans regions.
        Ok(region.filter(|r| !r.is_empty()))
    }

    fn instance_bounds(&self, instance_id: i64) -> Result<Option<Geometry<f64>>, EcoError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT bounds FROM treemap_instance WHERE id = ?")?;
        let mut rows = stmt.query([instance_id])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let wkt: Option<String> = row.get(0)?;
        wkt.as_deref().map(parse_wkt).transpose()
    }

    fn rows_for_instance(
        &self,
        instance_id: i64,
        filter: &RowFilter,
        with_location: bool,
    ) -> Result<Box<dyn RowSource>, EcoError> {
        Ok(Box::new(SqliteRowSource {
            conn: self.open()?,
            instance_id,
            filter: filter.clone(),
            with_location,
            buffer: VecDeque::new(),
            last_id: i64::MIN,
            exhausted: false,
        }))
    }

    fn load_overrides(&self) -> Result<OverrideMap, EcoError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT instance_id, region_code, species_id, itree_code \
             FROM treemap_itreecodeoverride",
        )?;
        let mut rows = stmt.query([])?;

        let mut overrides = OverrideMap::new();
        while let Some(row) = rows.next()? {
            let instance_id: i64 = row.get(0)?;
            let region: String = row.get(1)?;
            let species_id: i64 = row.get(2)?;
            let code: String = row.get(3)?;
            overrides
                .entry(instance_id)
                .or_insert_with(HashMap::new)
                .entry(region)
                .or_insert_with(HashMap::new)
                .insert(species_id, code);
        }
        Ok(overrides)
    }

    fn load_regions(&self) -> Result<Vec<Region>, EcoError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT code, geometry FROM treemap_itreeregion")?;
        let mut rows = stmt.query([])?;

        let mut regions = Vec::new();
        while let Some(row) = rows.next()? {
            let code: String = row.get(0)?;
            let wkt: String = row.get(1)?;
            regions.push(Region::from_wkt(code, &wkt)?);
        }
        debug!(regions = regions.len(), "loaded region boundaries");
        Ok(regions)
    }
}

/// A row source that owns its connection and pulls id-ordered batches with
/// keyset pagination. Dropping it part-way through closes the connection
/// and abandons the remaining batches, so early termination of a pass costs
/// nothing beyond the batch already in the buffer.
struct SqliteRowSource {
    conn: Connection,
    instance_id: i64,
    filter: RowFilter,
    with_location: bool,
    buffer: VecDeque<TreeRow>,
    last_id: i64,
    exhausted: bool,
}

impl SqliteRowSource {
    fn fetch_batch(&mut self) -> Result<(), EcoError> {
        let mut sql = String::from(
            "SELECT t.id, t.diameter, s.otm_code, t.species_id, t.x, t.y \
             FROM treemap_tree t \
             JOIN treemap_species s ON t.species_id = s.id \
             WHERE t.instance_id = ? AND t.diameter IS NOT NULL AND t.id > ?",
        );
        let mut params: Vec<Value> = vec![
            Value::Integer(self.instance_id),
            Value::Integer(self.last_id),
        ];
        if !self.filter.where_clause.is_empty() {
            sql.push_str(" AND (");
            sql.push_str(&self.filter.where_clause);
            sql.push(')');
            params.extend(self.filter.params.iter().map(|p| Value::Text(p.clone())));
        }
        sql.push_str(" ORDER BY t.id LIMIT ?");
        params.push(Value::Integer(ROW_BATCH as i64));

        let mut batch = Vec::with_capacity(ROW_BATCH);
        let mut last_id = self.last_id;
        {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut db_rows = stmt.query(rusqlite::params_from_iter(params))?;
            while let Some(row) = db_rows.next()? {
                let id: i64 = row.get(0)?;
                let diameter_in: f64 = row.get(1)?;
                let otmcode: String = row.get(2)?;
                let species_id: i64 = row.get(3)?;
                let diameter_cm = diameter_in * CENTIMETERS_PER_INCH;

                batch.push(if self.with_location {
                    let x: f64 = row.get(4)?;
                    let y: f64 = row.get(5)?;
                    TreeRow::WithRegion {
                        id,
                        diameter_cm,
                        otmcode,
                        species_id,
                        location: RowLocation::Point { x, y },
                    }
                } else {
                    TreeRow::WithoutRegion {
                        id,
                        diameter_cm,
                        otmcode,
                        species_id,
                    }
                });
                last_id = id;
            }
        }

        debug!(
            instance_id = self.instance_id,
            rows = batch.len(),
            "fetched tree row batch"
        );
        self.last_id = last_id;
        self.exhausted = batch.len() < ROW_BATCH;
        self.buffer.extend(batch);
        Ok(())
    }
}

impl RowSource for SqliteRowSource {
    fn next_row(&mut self) -> Result<Option<TreeRow>, EcoError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_batch()?;
        }
        Ok(self.buffer.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db(dir: &Path) -> PathBuf {
        let path = dir.join("eco.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE treemap_instance (
                 id INTEGER PRIMARY KEY,
                 itree_region_default TEXT,
                 bounds TEXT
             );
             CREATE TABLE treemap_species (
                 id INTEGER PRIMARY KEY,
                 otm_code TEXT NOT NULL
             );
             CREATE TABLE treemap_tree (
                 id INTEGER PRIMARY KEY,
                 instance_id INTEGER NOT NULL,
                 species_id INTEGER NOT NULL,
                 diameter REAL,
                 x REAL,
                 y REAL
             );
             CREATE TABLE treemap_itreeregion (
                 id INTEGER PRIMARY KEY,
                 code TEXT NOT NULL,
                 geometry TEXT NOT NULL
             );
             CREATE TABLE treemap_itreecodeoverride (
                 id INTEGER PRIMARY KEY,
                 instance_id INTEGER NOT NULL,
                 region_code TEXT NOT NULL,
                 species_id INTEGER NOT NULL,
                 itree_code TEXT NOT NULL
             );

             INSERT INTO treemap_instance VALUES
                 (1, 'NoEastXXX', NULL),
                 (2, NULL, 'POLYGON((0 0,0 2,2 2,2 0,0 0))'),
                 (3, '', NULL);
             INSERT INTO treemap_species VALUES (10, 'MASO'), (11, 'ULAM');
             INSERT INTO treemap_tree VALUES
                 (100, 1, 10, 11.0, 0.5, 0.5),
                 (101, 1, 11, 5.0, 1.5, 1.5),
                 (102, 1, 10, NULL, 0.0, 0.0),
                 (103, 2, 11, 4.0, 2.5, 2.5);
             INSERT INTO treemap_itreeregion VALUES
                 (1, 'NoEastXXX', 'POLYGON((0 0,0 2,2 2,2 0,0 0))');
             INSERT INTO treemap_itreecodeoverride VALUES
                 (1, 1, 'NoEastXXX', 10, 'BDS OTHER');",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_fixed_region_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        assert_eq!(
            backend.fixed_region_for_instance(1).unwrap().as_deref(),
            Some("NoEastXXX")
        );
        assert_eq!(backend.fixed_region_for_instance(2).unwrap(), None);
        // Empty string means no fixed region.
        assert_eq!(backend.fixed_region_for_instance(3).unwrap(), None);
        assert_eq!(backend.fixed_region_for_instance(99).unwrap(), None);
    }

    #[test]
    fn test_instance_bounds_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        let bounds = backend.instance_bounds(2).unwrap().unwrap();
        let regions = backend.load_regions().unwrap();
        assert!(regions[0].intersects(&bounds));
        // No stored boundary, and no such instance.
        assert!(backend.instance_bounds(1).unwrap().is_none());
        assert!(backend.instance_bounds(99).unwrap().is_none());
    }

    #[test]
    fn test_rows_without_location_convert_to_centimeters() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        let mut source = backend
            .rows_for_instance(1, &RowFilter::default(), false)
            .unwrap();
        let first = source.next_row().unwrap().unwrap();
        assert_eq!(first.id(), 100);
        assert_eq!(first.otmcode(), "MASO");
        assert!((first.diameter_cm() - 27.94).abs() < 1e-9);
        assert!(matches!(first, TreeRow::WithoutRegion { .. }));

        // NULL-diameter tree 102 is filtered out; 103 belongs to another
        // instance.
        let second = source.next_row().unwrap().unwrap();
        assert_eq!(second.id(), 101);
        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn test_rows_with_location_carry_points() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        let mut source = backend
            .rows_for_instance(1, &RowFilter::default(), true)
            .unwrap();
        let row = source.next_row().unwrap().unwrap();
        match row {
            TreeRow::WithRegion {
                location: RowLocation::Point { x, y },
                ..
            } => {
                assert!((x - 0.5).abs() < 1e-12);
                assert!((y - 0.5).abs() < 1e-12);
            }
            other => panic!("expected a point row, got {other:?}"),
        }
    }

    #[test]
    fn test_row_filter_narrows_query() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        let filter = RowFilter {
            where_clause: "s.otm_code = ?".to_string(),
            params: vec!["ULAM".to_string()],
        };
        let mut source = backend.rows_for_instance(1, &filter, false).unwrap();
        assert_eq!(source.next_row().unwrap().unwrap().id(), 101);
        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn test_row_source_streams_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(dir.path());
        let extra = ROW_BATCH as i64 + 10;
        {
            let conn = Connection::open(&path).unwrap();
            let mut stmt = conn
                .prepare("INSERT INTO treemap_tree VALUES (?, 5, 10, 2.0, 0.0, 0.0)")
                .unwrap();
            for id in 1000..1000 + extra {
                stmt.execute([id]).unwrap();
            }
        }

        let backend = SqliteBackend::new(path);
        let mut source = backend
            .rows_for_instance(5, &RowFilter::default(), false)
            .unwrap();
        let mut count = 0;
        let mut prev = i64::MIN;
        while let Some(row) = source.next_row().unwrap() {
            assert!(row.id() > prev);
            prev = row.id();
            count += 1;
        }
        assert_eq!(count, extra);
        // Exhausted sources stay exhausted.
        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn test_load_overrides_shape() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        let overrides = backend.load_overrides().unwrap();
        assert_eq!(overrides[&1]["NoEastXXX"][&10], "BDS OTHER");
    }

    #[test]
    fn test_load_regions_parses_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(seeded_db(dir.path()));

        let regions = backend.load_regions().unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].code(), "NoEastXXX");
        assert!(regions[0].contains(1.0, 1.0));
    }
}
