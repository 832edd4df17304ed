use std::collections::HashMap;

use crate::curves::SpeciesMap;
use crate::error::EcoError;

/// instance id -> region -> species id -> growth-curve code. Overrides the
/// species table for exactly that triple.
pub type OverrideMap = HashMap<i64, HashMap<String, HashMap<i64, String>>>;

/// Resolves the authoritative growth-curve code for a tree: the region's
/// species table layered with per-instance overrides.
///
/// Built once from the loaded tables and shared by reference across
/// requests; both maps are immutable for its lifetime.
#[derive(Debug, Clone, Default)]
pub struct CodeResolver {
    species: SpeciesMap,
    overrides: OverrideMap,
}

impl CodeResolver {
    pub fn new(species: SpeciesMap, overrides: OverrideMap) -> Self {
        Self { species, overrides }
    }

    pub fn species(&self) -> &SpeciesMap {
        &self.species
    }

    /// Look up the growth-curve code for `(otmcode, species_id)` in
    /// `region`, applying any override for `instance_id`.
    ///
    /// An override at exactly (instance, region, species id) replaces the
    /// baseline code even when the baseline lookup found nothing. Instances
    /// without overrides are the normal case, not an error; the error
    /// diagnostics distinguish the remaining not-found shapes.
    pub fn resolve(
        &self,
        otmcode: &str,
        species_id: i64,
        region: &str,
        instance_id: i64,
    ) -> Result<&str, EcoError> {
        let species_for_region = self
            .species
            .get(region)
            .ok_or_else(|| EcoError::MissingSpeciesTable(region.to_string()))?;

        let mut code = species_for_region.get(otmcode).map(|s| s.as_str());
        let mut not_found_message = format!(
            "Growth-curve code not found for otmcode {} in region {}",
            otmcode, region
        );

        if let Some(for_instance) = self.overrides.get(&instance_id) {
            if let Some(for_region) = for_instance.get(region) {
                if let Some(override_code) = for_region.get(&species_id) {
                    code = Some(override_code.as_str());
                } else {
                    not_found_message = format!(
                        "There are overrides defined for instance {} in the {} region \
                         but not for species ID {}",
                        instance_id, region, species_id
                    );
                }
            } else {
                not_found_message = format!(
                    "There are overrides defined for the instance, but not for the {} region",
                    region
                );
            }
        }

        code.ok_or(EcoError::CodeNotFound(not_found_message))
    }

    /// Non-failing variant used by dataset scans, where a miss skips the
    /// tree instead of aborting the pass.
    pub fn resolve_opt(
        &self,
        otmcode: &str,
        species_id: i64,
        region: &str,
        instance_id: i64,
    ) -> Option<&str> {
        self.resolve(otmcode, species_id, region, instance_id).ok()
    }
}
