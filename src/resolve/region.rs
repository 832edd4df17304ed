use std::borrow::Borrow;

use geo::{Contains, Intersects};
use geo_types::{Geometry, Point};
use wkt::TryFromWkt;

use crate::error::EcoError;

/// Parse a bare WKT geometry.
pub fn parse_wkt(wkt_str: &str) -> Result<Geometry<f64>, EcoError> {
    Geometry::try_from_wkt_str(wkt_str).map_err(|e| EcoError::Geometry(format!("invalid WKT: {e}")))
}

/// An eco-region: a code plus its boundary geometry. Geometries are parsed
/// once at load time and owned by the region for its whole life; callers
/// only ever see the containment query, never the raw geometry.
#[derive(Debug, Clone)]
pub struct Region {
    code: String,
    geometry: Geometry<f64>,
}

impl Region {
    /// Parse a region boundary from WKT (POLYGON or MULTIPOLYGON).
    pub fn from_wkt(code: impl Into<String>, wkt_str: &str) -> Result<Self, EcoError> {
        let code = code.into();
        let geometry = Geometry::try_from_wkt_str(wkt_str)
            .map_err(|e| EcoError::Geometry(format!("invalid WKT for region {}: {}", code, e)))?;
        Ok(Self { code, geometry })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Point-in-region test. Boundary behavior follows the geometry
    /// backend; degenerate geometries are garbage in, garbage out.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }

    /// Whether this region's boundary intersects the given geometry, e.g.
    /// an instance boundary.
    pub fn intersects(&self, geometry: &Geometry<f64>) -> bool {
        self.geometry.intersects(geometry)
    }
}

/// Spatial region resolution over a candidate list, with a locality
/// heuristic: consecutive trees are highly spatially correlated, so the
/// scan starts at the last successful index and wraps. The heuristic only
/// affects how many containment tests run, never which region matches.
#[derive(Debug, Default)]
pub struct RegionResolver {
    last_matched: usize,
}

impl RegionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the most recent successful match, used as the next scan's
    /// starting point.
    pub fn last_matched(&self) -> usize {
        self.last_matched
    }

    /// Find the first candidate region containing `(x, y)`, or `None` when
    /// no region contains the point (the tree is excluded, not an error).
    pub fn resolve<'a, R>(&mut self, candidates: &'a [R], x: f64, y: f64) -> Option<&'a str>
    where
        R: Borrow<Region>,
    {
        let n = candidates.len();
        for i in 0..n {
            let idx = (i + self.last_matched) % n;
            let region = candidates[idx].borrow();
            if region.contains(x, y) {
                self.last_matched = idx;
                return Some(region.code());
            }
        }
        None
    }
}
