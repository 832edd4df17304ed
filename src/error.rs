use thiserror::Error;

/// Errors that can occur while loading eco-benefit data or running a
/// benefit calculation pass.
#[derive(Error, Debug)]
pub enum EcoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A curve or species file was malformed or unreadable. Fatal at load.
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// The spatial backend failed to build or query a region geometry.
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// No curve data exists for the named region.
    #[error("No curve data is available for the region with code {0}")]
    RegionNotFound(String),

    /// The species table has no entry for the region at all.
    #[error("Species data not found for the {0} region")]
    MissingSpeciesTable(String),

    /// A growth-curve code could not be resolved. The message carries the
    /// sub-reason diagnostic (missing otmcode, or overrides present but not
    /// matching the region or species id).
    #[error("{0}")]
    CodeNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[cfg(feature = "web")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
