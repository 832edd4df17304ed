use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::cache::EcoSnapshot;
use crate::engine::{Scenario, ScanOptions};
use crate::error::EcoError;
use crate::models::{RowFilter, CENTIMETERS_PER_INCH};
use crate::resolve::Region;

use super::state::AppState;

// ---------------------------------------------------------------------------
// Error wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

#[derive(Debug)]
pub(crate) struct WebError(EcoError);

impl From<EcoError> for WebError {
    fn from(e: EcoError) -> Self {
        WebError(e)
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type) = match &self.0 {
            EcoError::Validation(_) | EcoError::CodeNotFound(_) => {
                (actix_web::http::StatusCode::BAD_REQUEST, "Bad Request")
            }
            EcoError::RegionNotFound(_) | EcoError::MissingSpeciesTable(_) => {
                (actix_web::http::StatusCode::NOT_FOUND, "Not Found")
            }
            _ => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ),
        };
        HttpResponse::build(status).json(ErrorBody {
            error: error_type.to_string(),
            details: self.0.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Single-tree calculation
// ---------------------------------------------------------------------------

/// Wire names are fixed by the clients: `instanceid` and `speciesid`, no
/// underscores. All five parameters are required; a missing one is a 400.
#[derive(Deserialize)]
pub struct EcoQuery {
    otmcode: String,
    /// Diameter at breast height, in inches.
    diameter: f64,
    region: String,
    instanceid: i64,
    speciesid: i64,
}

pub async fn eco_json(
    state: web::Data<AppState>,
    query: web::Query<EcoQuery>,
) -> Result<HttpResponse, WebError> {
    let snapshot = state.cache.snapshot();
    let engine = snapshot.engine();

    let code = snapshot.resolver.resolve(
        &query.otmcode,
        query.speciesid,
        &query.region,
        query.instanceid,
    )?;
    let benefits =
        engine.benefits_for_tree(&query.region, code, query.diameter * CENTIMETERS_PER_INCH)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "Benefits": benefits })))
}

// ---------------------------------------------------------------------------
// Dataset passes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DatasetRequest {
    instance_id: i64,
    /// Forces a region for the whole pass, bypassing the backend's
    /// fixed-region lookup and spatial resolution.
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    filter: RowFilter,
}

/// Work out the scan scope for a dataset request: the fixed region, when
/// one applies, and the candidate regions for the spatial pass otherwise.
///
/// An explicit request region wins, then the instance's stored default.
/// Without either, the instance boundary narrows the candidates to the
/// regions it intersects; an instance intersecting exactly one region runs
/// as if that region were fixed. Any fixed region must have curve data.
fn scan_scope(
    state: &AppState,
    snapshot: &EcoSnapshot,
    req: &DatasetRequest,
) -> Result<(Option<String>, Vec<Arc<Region>>), EcoError> {
    let fixed = match &req.region {
        Some(r) => Some(r.clone()),
        None => state.backend.fixed_region_for_instance(req.instance_id)?,
    };
    if let Some(region) = fixed {
        if !snapshot.curves.has_region(&region) {
            return Err(EcoError::RegionNotFound(region));
        }
        return Ok((Some(region), Vec::new()));
    }

    let candidates = match state.backend.instance_bounds(req.instance_id)? {
        Some(bounds) => {
            let hits: Vec<Arc<Region>> = snapshot
                .regions
                .iter()
                .filter(|r| r.intersects(&bounds))
                .cloned()
                .collect();
            if let [only] = hits.as_slice() {
                let region = only.code().to_string();
                if !snapshot.curves.has_region(&region) {
                    return Err(EcoError::RegionNotFound(region));
                }
                return Ok((Some(region), Vec::new()));
            }
            hits
        }
        None => snapshot.regions.clone(),
    };
    Ok((None, candidates))
}

pub async fn eco_summary(
    state: web::Data<AppState>,
    body: web::Json<DatasetRequest>,
) -> Result<HttpResponse, WebError> {
    let snapshot = state.cache.snapshot();
    let (fixed, candidates) = scan_scope(&state, &snapshot, &body)?;
    let mut rows =
        state
            .backend
            .rows_for_instance(body.instance_id, &body.filter, fixed.is_none())?;

    let opts = ScanOptions {
        candidates,
        fixed_region: fixed,
        instance_id: body.instance_id,
    };
    let summary = snapshot.engine().run_summary(&opts, rows.as_mut())?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn eco_full(
    state: web::Data<AppState>,
    body: web::Json<DatasetRequest>,
) -> Result<HttpResponse, WebError> {
    let snapshot = state.cache.snapshot();
    let (fixed, candidates) = scan_scope(&state, &snapshot, &body)?;
    let mut rows =
        state
            .backend
            .rows_for_instance(body.instance_id, &body.filter, fixed.is_none())?;

    let opts = ScanOptions {
        candidates,
        fixed_region: fixed,
        instance_id: body.instance_id,
    };
    let full = snapshot.engine().run_full(&opts, rows.as_mut())?;
    Ok(HttpResponse::Ok().json(full))
}

pub async fn eco_scenario(
    state: web::Data<AppState>,
    body: web::Json<Scenario>,
) -> Result<HttpResponse, WebError> {
    let snapshot = state.cache.snapshot();
    let result = snapshot.engine().run_scenario(&body)?;
    Ok(HttpResponse::Ok().json(result))
}

// ---------------------------------------------------------------------------
// Metadata and cache control
// ---------------------------------------------------------------------------

pub async fn itree_codes(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.cache.snapshot();
    HttpResponse::Ok().json(snapshot.curves.codes_by_region())
}

pub async fn invalidate_cache(state: web::Data<AppState>) -> Result<HttpResponse, WebError> {
    state.rebuild()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
