mod loader;

use std::collections::HashMap;

use crate::error::EcoError;

pub use loader::{load_species_map, parse_curve, CurveStore, SpeciesMap};

/// A piecewise-linear benefit curve for one (region, factor) pair: a shared
/// list of DBH breaks and, per growth-curve code, the factor values at each
/// break.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorCurve {
    breaks: Vec<f64>,
    values: HashMap<String, Vec<f64>>,
}

impl FactorCurve {
    /// Build a curve, validating that breaks are strictly increasing with at
    /// least two entries and that every value row lines up with them.
    pub fn new(breaks: Vec<f64>, values: HashMap<String, Vec<f64>>) -> Result<Self, EcoError> {
        if breaks.len() < 2 {
            return Err(EcoError::DataLoad(format!(
                "curve needs at least 2 diameter breaks, got {}",
                breaks.len()
            )));
        }
        if breaks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EcoError::DataLoad(
                "diameter breaks must be strictly increasing".to_string(),
            ));
        }
        for (code, row) in &values {
            if row.len() != breaks.len() {
                return Err(EcoError::DataLoad(format!(
                    "curve row for code {} has {} values but {} breaks",
                    code,
                    row.len(),
                    breaks.len()
                )));
            }
        }
        Ok(Self { breaks, values })
    }

    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    /// Growth-curve codes this curve has data for.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|s| s.as_str())
    }

    /// Evaluate the curve for one growth-curve code at a diameter in
    /// centimeters. Codes absent from the curve contribute nothing.
    ///
    /// Below the first break the first value is used flat. At or past the
    /// last break the final segment's line is extended — deliberate linear
    /// extrapolation, matching the historical behavior downstream consumers
    /// calibrated against, even though the data nominally ends there.
    pub fn evaluate(&self, code: &str, diameter_cm: f64) -> Option<f64> {
        let values = self.values.get(code)?;
        Some(interpolate(&self.breaks, values, diameter_cm))
    }
}

/// Piecewise-linear evaluation over aligned break/value lists.
///
/// Segment selection: the first break greater than the diameter closes the
/// segment; diameters at or past the last break reuse the final segment.
fn interpolate(breaks: &[f64], values: &[f64], diameter: f64) -> f64 {
    let last = breaks.len() - 1;

    let (break_min, break_max, value_min, value_max) = if diameter >= breaks[last] {
        (breaks[last - 1], breaks[last], values[last - 1], values[last])
    } else {
        // Unwrap is safe: diameter < breaks[last] guarantees a hit.
        let i = breaks
            .iter()
            .position(|b| diameter < *b)
            .expect("diameter below last break");
        if i == 0 {
            // Below the supported range: degenerate segment, flat value.
            (breaks[0], breaks[0], values[0], values[0])
        } else {
            (breaks[i - 1], breaks[i], values[i - 1], values[i])
        }
    };

    if break_min == break_max {
        value_min
    } else {
        // y = mx + b over the selected segment.
        let slope = (value_max - value_min) / (break_max - break_min);
        let intercept = value_max - slope * break_max;
        slope * diameter + intercept
    }
}
