use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::debug;

use crate::curves::{CurveStore, FactorCurve};
use crate::error::EcoError;
use crate::models::{
    BenefitSummary, BenefitVector, Factor, FullBenefits, RowLocation, RowSource, ScenarioResult,
    TreeRow,
};
use crate::resolve::{CodeResolver, Region, RegionResolver};

/// Scope of one accumulation pass over a row source.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Candidate regions for spatial resolution. May be empty when a fixed
    /// region is set.
    pub candidates: Vec<Arc<Region>>,
    /// The common, cheap path: a single-region instance skips spatial
    /// resolution entirely.
    pub fixed_region: Option<String>,
    pub instance_id: i64,
}

/// One hypothetical tree in a scenario: a diameter per year it is alive.
/// Leading zeros stand in for years before planting (or after death and
/// replacement) and contribute nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTree {
    pub otmcode: String,
    pub species_id: i64,
    /// Overrides the scenario-wide region for this tree.
    #[serde(default)]
    pub region: Option<String>,
    pub diameters: Vec<f64>,
}

/// A caller-supplied planting scenario evaluated over a year horizon.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub region: Option<String>,
    pub instance_id: i64,
    /// Must be >= the length of the longest diameter array.
    pub years: usize,
    pub scenario_trees: Vec<ScenarioTree>,
}

/// The benefit accumulator: drives region resolution, code resolution and
/// curve evaluation across tree rows or scenario trees.
///
/// Holds shared references to the immutable lookup tables; one engine value
/// is cheap to construct per request from a cache snapshot.
pub struct BenefitEngine<'a> {
    curves: &'a CurveStore,
    resolver: &'a CodeResolver,
}

impl<'a> BenefitEngine<'a> {
    pub fn new(curves: &'a CurveStore, resolver: &'a CodeResolver) -> Self {
        Self { curves, resolver }
    }

    /// Evaluate every factor curve for one tree with an already-resolved
    /// growth-curve code. The diameter is in centimeters.
    pub fn benefits_for_tree(
        &self,
        region: &str,
        code: &str,
        diameter_cm: f64,
    ) -> Result<BenefitVector, EcoError> {
        let curves = self
            .curves
            .curves_for(region)
            .ok_or_else(|| EcoError::RegionNotFound(region.to_string()))?;
        Ok(evaluate_all(curves, code, diameter_cm))
    }

    /// Run a summary pass: aggregate benefits plus a tree count.
    pub fn run_summary(
        &self,
        opts: &ScanOptions,
        rows: &mut dyn RowSource,
    ) -> Result<BenefitSummary, EcoError> {
        self.accumulate(opts, rows, None)
    }

    /// Run a full pass: per-tree benefit vectors keyed by row id, plus the
    /// same aggregate a summary pass would produce.
    pub fn run_full(
        &self,
        opts: &ScanOptions,
        rows: &mut dyn RowSource,
    ) -> Result<FullBenefits, EcoError> {
        let mut trees = BTreeMap::new();
        let summary = self.accumulate(opts, rows, Some(&mut trees))?;
        Ok(FullBenefits { trees, summary })
    }

    /// The shared driving loop. Per-tree resolution misses skip the tree;
    /// fetch errors abort the pass.
    fn accumulate(
        &self,
        opts: &ScanOptions,
        rows: &mut dyn RowSource,
        mut per_tree: Option<&mut BTreeMap<i64, BenefitVector>>,
    ) -> Result<BenefitSummary, EcoError> {
        let started = Instant::now();
        let mut totals = BenefitVector::zero();
        let mut n_trees: u64 = 0;
        let mut skipped: u64 = 0;
        let mut spatial = RegionResolver::new();

        while let Some(row) = rows.next_row()? {
            let region = match (&opts.fixed_region, &row) {
                (Some(fixed), _) => Some(fixed.as_str()),
                (
                    None,
                    TreeRow::WithRegion {
                        location: RowLocation::RegionCode(code),
                        ..
                    },
                ) => Some(code.as_str()),
                (
                    None,
                    TreeRow::WithRegion {
                        location: RowLocation::Point { x, y },
                        ..
                    },
                ) => spatial.resolve(&opts.candidates, *x, *y),
                (None, TreeRow::WithoutRegion { .. }) => {
                    return Err(EcoError::Validation(
                        "row source without region data requires a fixed region".to_string(),
                    ));
                }
            };

            // A point outside every candidate region excludes the tree.
            let Some(region) = region else {
                skipped += 1;
                continue;
            };

            let Some(code) =
                self.resolver
                    .resolve_opt(row.otmcode(), row.species_id(), region, opts.instance_id)
            else {
                debug!(
                    otmcode = row.otmcode(),
                    region, "no growth-curve code, skipping tree"
                );
                skipped += 1;
                continue;
            };

            let Some(curves) = self.curves.curves_for(region) else {
                debug!(region, "no curve data for region, skipping tree");
                skipped += 1;
                continue;
            };

            let tree_benefits = evaluate_all(curves, code, row.diameter_cm());
            totals.accumulate(&tree_benefits);
            if let Some(map) = per_tree.as_deref_mut() {
                map.insert(row.id(), tree_benefits);
            }
            n_trees += 1;
        }

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            n_trees, skipped, "accumulation pass finished"
        );

        Ok(BenefitSummary {
            benefits: totals,
            n_trees,
        })
    }

    /// Evaluate a planting scenario: per-year totals across all trees plus
    /// a grand total. Resolution failures are fatal here, since the caller
    /// names every tree explicitly.
    pub fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioResult, EcoError> {
        let mut years = vec![BenefitVector::zero(); scenario.years];
        let mut total = BenefitVector::zero();

        for tree in &scenario.scenario_trees {
            if tree.diameters.len() > scenario.years {
                return Err(EcoError::Validation(format!(
                    "scenario tree has {} diameters but the horizon is {} years",
                    tree.diameters.len(),
                    scenario.years
                )));
            }

            let region = tree
                .region
                .as_deref()
                .or(scenario.region.as_deref())
                .ok_or_else(|| {
                    EcoError::Validation(format!(
                        "no region for scenario tree with otmcode {}",
                        tree.otmcode
                    ))
                })?;

            let curves = self
                .curves
                .curves_for(region)
                .ok_or_else(|| EcoError::RegionNotFound(region.to_string()))?;

            let code =
                self.resolver
                    .resolve(&tree.otmcode, tree.species_id, region, scenario.instance_id)?;

            for (year, diameter) in tree.diameters.iter().enumerate() {
                // Placeholder year: the tree is not in the ground.
                if *diameter <= 0.0 {
                    continue;
                }
                let benefits = evaluate_all(curves, code, *diameter);
                years[year].accumulate(&benefits);
                total.accumulate(&benefits);
            }
        }

        Ok(ScenarioResult { years, total })
    }
}

/// Evaluate all fifteen curves for one code/diameter. Factors without data
/// for the code contribute zero.
fn evaluate_all(curves: &[FactorCurve], code: &str, diameter_cm: f64) -> BenefitVector {
    let mut benefits = BenefitVector::zero();
    for (factor, curve) in Factor::ALL.iter().zip(curves) {
        if let Some(value) = curve.evaluate(code, diameter_cm) {
            benefits.add(*factor, value);
        }
    }
    benefits
}
