use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::factor::{Factor, FACTOR_COUNT};

/// Per-tree or aggregate benefit values, one entry per [`Factor`], in
/// [`Factor::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BenefitVector {
    values: [f64; FACTOR_COUNT],
}

impl BenefitVector {
    /// A zeroed vector.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.values[factor.index()]
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        self.values[factor.index()] = value;
    }

    /// Add `value` to the entry for `factor`.
    pub fn add(&mut self, factor: Factor, value: f64) {
        self.values[factor.index()] += value;
    }

    /// Element-wise accumulate another vector into this one.
    pub fn accumulate(&mut self, other: &BenefitVector) {
        for (sum, v) in self.values.iter_mut().zip(other.values.iter()) {
            *sum += v;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Factor-name-keyed view, for JSON output and reporting.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        Factor::ALL
            .iter()
            .map(|f| (f.name(), self.get(*f)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.iter().map(move |f| (*f, self.get(*f)))
    }
}

impl Serialize for BenefitVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FACTOR_COUNT))?;
        for factor in Factor::ALL {
            map.serialize_entry(factor.name(), &self.get(factor))?;
        }
        map.end()
    }
}

/// Aggregate result of a summary pass: running totals plus the number of
/// trees that contributed.
#[derive(Debug, Clone, Default)]
pub struct BenefitSummary {
    pub benefits: BenefitVector,
    pub n_trees: u64,
}

impl BenefitSummary {
    /// Flat map including the derived `n_trees` entry, matching the wire
    /// shape consumers expect.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map: BTreeMap<String, f64> = self
            .benefits
            .to_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        map.insert("n_trees".to_string(), self.n_trees as f64);
        map
    }
}

impl Serialize for BenefitSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FACTOR_COUNT + 1))?;
        for factor in Factor::ALL {
            map.serialize_entry(factor.name(), &self.benefits.get(factor))?;
        }
        map.serialize_entry("n_trees", &(self.n_trees as f64))?;
        map.end()
    }
}

/// Result of a full pass: per-tree vectors keyed by row id, plus the
/// aggregate over the same rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FullBenefits {
    pub trees: BTreeMap<i64, BenefitVector>,
    pub summary: BenefitSummary,
}

/// Result of a scenario pass: one vector per year plus a grand total.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    #[serde(rename = "Years")]
    pub years: Vec<BenefitVector>,
    #[serde(rename = "Total")]
    pub total: BenefitVector,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_zero_vector_is_zero() {
        let v = BenefitVector::zero();
        assert!(v.is_zero());
        for factor in Factor::ALL {
            assert_eq!(v.get(factor), 0.0);
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut v = BenefitVector::zero();
        v.add(Factor::Co2Storage, 110.79107);
        v.add(Factor::Co2Storage, 1.0);
        assert_approx_eq!(v.get(Factor::Co2Storage), 111.79107);
        assert_eq!(v.get(Factor::Bvoc), 0.0);
        assert!(!v.is_zero());
    }

    #[test]
    fn test_accumulate_sums_elementwise() {
        let mut a = BenefitVector::zero();
        a.add(Factor::Electricity, 2.0);
        a.add(Factor::Bvoc, 1.0);

        let mut b = BenefitVector::zero();
        b.add(Factor::Electricity, 3.0);
        b.add(Factor::NaturalGas, -1.5);

        a.accumulate(&b);
        assert_approx_eq!(a.get(Factor::Electricity), 5.0);
        assert_approx_eq!(a.get(Factor::Bvoc), 1.0);
        assert_approx_eq!(a.get(Factor::NaturalGas), -1.5);
    }

    #[test]
    fn test_to_map_covers_all_factors() {
        let mut v = BenefitVector::zero();
        v.set(Factor::HydroInterception, 2.59);
        let map = v.to_map();
        assert_eq!(map.len(), FACTOR_COUNT);
        assert_approx_eq!(map["hydro_interception"], 2.59);
        assert_eq!(map["electricity"], 0.0);
    }

    #[test]
    fn test_vector_serializes_as_named_map() {
        let mut v = BenefitVector::zero();
        v.set(Factor::Co2Avoided, 12.0864829);
        let json = serde_json::to_value(&v).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), FACTOR_COUNT);
        assert_approx_eq!(obj["co2_avoided"].as_f64().unwrap(), 12.0864829);
    }

    #[test]
    fn test_summary_map_includes_tree_count() {
        let summary = BenefitSummary {
            benefits: BenefitVector::zero(),
            n_trees: 42,
        };
        let map = summary.to_map();
        assert_eq!(map.len(), FACTOR_COUNT + 1);
        assert_eq!(map["n_trees"], 42.0);
    }

    #[test]
    fn test_summary_serializes_with_tree_count() {
        let mut summary = BenefitSummary::default();
        summary.benefits.set(Factor::Electricity, 12.18);
        summary.n_trees = 3;
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["n_trees"].as_f64().unwrap(), 3.0);
        assert_approx_eq!(json["electricity"].as_f64().unwrap(), 12.18);
    }

    #[test]
    fn test_scenario_result_wire_shape() {
        let result = ScenarioResult {
            years: vec![BenefitVector::zero()],
            total: BenefitVector::zero(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("Years").is_some());
        assert!(json.get("Total").is_some());
        assert_eq!(json["Years"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_iter_order_matches_all() {
        let v = BenefitVector::zero();
        let factors: Vec<Factor> = v.iter().map(|(f, _)| f).collect();
        assert_eq!(factors, Factor::ALL.to_vec());
    }
}
