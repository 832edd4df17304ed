use crate::error::EcoError;

/// Conversion applied exactly once at the core boundary: stored diameters
/// are in inches, every curve break is in centimeters.
pub const CENTIMETERS_PER_INCH: f64 = 2.54;

/// Where a row's region comes from when the dataset spans several regions.
#[derive(Debug, Clone, PartialEq)]
pub enum RowLocation {
    /// The region code is embedded in the row.
    RegionCode(String),
    /// Raw coordinates; the region must be resolved spatially.
    Point { x: f64, y: f64 },
}

/// One tree record pulled from a row source.
///
/// The shape is decided once per row source: sources opened for a
/// fixed-region pass yield `WithoutRegion`, sources for a multi-region pass
/// yield `WithRegion` carrying either an embedded code or coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeRow {
    WithRegion {
        id: i64,
        diameter_cm: f64,
        otmcode: String,
        species_id: i64,
        location: RowLocation,
    },
    WithoutRegion {
        id: i64,
        diameter_cm: f64,
        otmcode: String,
        species_id: i64,
    },
}

impl TreeRow {
    pub fn id(&self) -> i64 {
        match self {
            TreeRow::WithRegion { id, .. } | TreeRow::WithoutRegion { id, .. } => *id,
        }
    }

    pub fn diameter_cm(&self) -> f64 {
        match self {
            TreeRow::WithRegion { diameter_cm, .. }
            | TreeRow::WithoutRegion { diameter_cm, .. } => *diameter_cm,
        }
    }

    pub fn otmcode(&self) -> &str {
        match self {
            TreeRow::WithRegion { otmcode, .. } | TreeRow::WithoutRegion { otmcode, .. } => otmcode,
        }
    }

    pub fn species_id(&self) -> i64 {
        match self {
            TreeRow::WithRegion { species_id, .. }
            | TreeRow::WithoutRegion { species_id, .. } => *species_id,
        }
    }
}

/// A source of tree rows, owned exclusively by the accumulation pass that
/// opened it. The underlying cursor is released when the source is dropped,
/// on every exit path; abandoning iteration is the cancellation mechanism.
pub trait RowSource {
    /// Fetch the next row, `Ok(None)` at the end of the set. A fetch error
    /// is fatal to the pass.
    fn next_row(&mut self) -> Result<Option<TreeRow>, EcoError>;
}

/// Caller-supplied row scoping for [`crate::backend::DataBackend`] queries:
/// a filter clause with positional placeholders and its parameters.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RowFilter {
    #[serde(default)]
    pub where_clause: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// In-memory row source over a prepared vector of rows. The mock backend
/// for tests, and useful for callers that already hold their trees.
#[derive(Debug, Default)]
pub struct VecRowSource {
    rows: std::vec::IntoIter<TreeRow>,
}

impl VecRowSource {
    pub fn new(rows: Vec<TreeRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<TreeRow>, EcoError> {
        Ok(self.rows.next())
    }
}
