use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::debug;

use crate::error::EcoError;
use crate::models::{Factor, FACTOR_COUNT};

use super::FactorCurve;

/// region -> otmcode -> growth-curve code, loaded from the combined master
/// species table.
pub type SpeciesMap = HashMap<String, HashMap<String, String>>;

/// Load the master species table from a JSON file.
pub fn load_species_map(path: impl AsRef<Path>) -> Result<SpeciesMap, EcoError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&text)?)
}

/// Immutable per-region curve tables: one [`FactorCurve`] per factor, in
/// [`Factor::ALL`] order. Loaded once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct CurveStore {
    regions: HashMap<String, Vec<FactorCurve>>,
}

impl CurveStore {
    /// Build a store from per-region curve lists, each aligned to
    /// [`Factor::ALL`].
    pub fn new(regions: HashMap<String, Vec<FactorCurve>>) -> Result<Self, EcoError> {
        for (region, curves) in &regions {
            if curves.len() != FACTOR_COUNT {
                return Err(EcoError::DataLoad(format!(
                    "region {} has {} factor curves, expected {}",
                    region,
                    curves.len(),
                    FACTOR_COUNT
                )));
            }
        }
        Ok(Self { regions })
    }

    /// Load every `output__{region}__{factor}.csv` file in a directory.
    ///
    /// File layout (one file per region/factor pair): the first line holds
    /// the diameter breaks in centimeters, every following line a
    /// growth-curve code and its value at each break. A region missing any
    /// of the fifteen factor files is a load error rather than a latent
    /// crash at first evaluation.
    pub fn load_dir(base_path: impl AsRef<Path>) -> Result<Self, EcoError> {
        let base_path = base_path.as_ref();
        let mut partial: HashMap<String, Vec<Option<FactorCurve>>> = HashMap::new();

        for entry in std::fs::read_dir(base_path)? {
            let entry = entry?;
            let path = entry.path();
            let Some((region, factor)) = parse_curve_filename(&path) else {
                debug!(path = %path.display(), "skipping non-curve file");
                continue;
            };

            let curve = load_curve_file(&path)?;
            let slots = partial
                .entry(region)
                .or_insert_with(|| vec![None; FACTOR_COUNT]);
            slots[factor.index()] = Some(curve);
        }

        let mut regions = HashMap::with_capacity(partial.len());
        for (region, slots) in partial {
            let mut curves = Vec::with_capacity(FACTOR_COUNT);
            for (factor, slot) in Factor::ALL.iter().zip(slots) {
                match slot {
                    Some(curve) => curves.push(curve),
                    None => {
                        return Err(EcoError::DataLoad(format!(
                            "region {} is missing curve data for factor {}",
                            region, factor
                        )))
                    }
                }
            }
            regions.insert(region, curves);
        }

        Ok(Self { regions })
    }

    /// The factor-ordered curves for a region, if it has data.
    pub fn curves_for(&self, region: &str) -> Option<&[FactorCurve]> {
        self.regions.get(region).map(|v| v.as_slice())
    }

    pub fn has_region(&self, region: &str) -> bool {
        self.regions.contains_key(region)
    }

    pub fn region_codes(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Valid growth-curve codes per region. All curves of a region share
    /// the same code set, so the first curve is representative.
    pub fn codes_by_region(&self) -> BTreeMap<String, Vec<String>> {
        self.regions
            .iter()
            .map(|(region, curves)| {
                let mut codes: Vec<String> =
                    curves[0].codes().map(|c| c.to_string()).collect();
                codes.sort_unstable();
                (region.clone(), codes)
            })
            .collect()
    }
}

/// Extract (region, factor) from a curve file path of the form
/// `output__{region}__{factor}.csv`. Anything else is ignored.
fn parse_curve_filename(path: &Path) -> Option<(String, Factor)> {
    if path.extension().and_then(|e| e.to_str()) != Some("csv") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.split("__");
    if parts.next()? != "output" {
        return None;
    }
    let region = parts.next()?;
    let factor = Factor::from_name(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((region.to_string(), factor))
}

fn load_curve_file(path: &Path) -> Result<FactorCurve, EcoError> {
    let data = std::fs::read(path)?;
    parse_curve(&data).map_err(|e| match e {
        EcoError::DataLoad(msg) => EcoError::DataLoad(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Parse the contents of one curve CSV file.
pub fn parse_curve(data: &[u8]) -> Result<FactorCurve, EcoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut records = rdr.records();

    let header = records
        .next()
        .ok_or_else(|| EcoError::DataLoad("curve file is empty".to_string()))??;

    // First line: a blank corner cell, then the diameter breaks. Trailing
    // empty cells from spreadsheet exports are tolerated.
    let mut breaks = Vec::with_capacity(header.len().saturating_sub(1));
    for field in header.iter().skip(1) {
        if field.is_empty() {
            continue;
        }
        breaks.push(parse_float(field)?);
    }
    let target_len = breaks.len();

    let mut values: HashMap<String, Vec<f64>> = HashMap::new();
    for record in records {
        let record = record?;
        // Short rows (ragged export artifacts) carry no usable curve.
        if record.len() < target_len + 1 {
            continue;
        }
        let code = record
            .get(0)
            .unwrap_or_default()
            .to_string();
        let mut row = Vec::with_capacity(target_len);
        for field in record.iter().skip(1).take(target_len) {
            row.push(parse_float(field)?);
        }
        values.insert(code, row);
    }

    FactorCurve::new(breaks, values)
}

fn parse_float(field: &str) -> Result<f64, EcoError> {
    field
        .parse::<f64>()
        .map_err(|_| EcoError::DataLoad(format!("invalid numeric value '{}'", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    /// Write all fifteen factor files for a region with a shared two-break
    /// curve for one code.
    fn write_region_fixtures(dir: &Path, region: &str, code: &str) {
        for factor in Factor::ALL {
            let path = dir.join(format!("output__{}__{}.csv", region, factor));
            let mut f = std::fs::File::create(path).unwrap();
            writeln!(f, ",1.0,3.0").unwrap();
            writeln!(f, "{},4.0,6.0", code).unwrap();
        }
    }

    #[test]
    fn test_parse_curve_filename() {
        let p = PathBuf::from("output__NoEastXXX__natural_gas.csv");
        let (region, factor) = parse_curve_filename(&p).unwrap();
        assert_eq!(region, "NoEastXXX");
        assert_eq!(factor, Factor::NaturalGas);
    }

    #[test]
    fn test_parse_curve_filename_rejects_non_curves() {
        assert!(parse_curve_filename(Path::new("species.json")).is_none());
        assert!(parse_curve_filename(Path::new("README.csv")).is_none());
        assert!(parse_curve_filename(Path::new("output__R__not_a_factor.csv")).is_none());
        assert!(parse_curve_filename(Path::new("output__R__bvoc__extra.csv")).is_none());
    }

    #[test]
    fn test_load_dir_builds_complete_region() {
        let dir = tempfile::tempdir().unwrap();
        write_region_fixtures(dir.path(), "NoEastXXX", "ACPL");

        let store = CurveStore::load_dir(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.has_region("NoEastXXX"));

        let curves = store.curves_for("NoEastXXX").unwrap();
        assert_eq!(curves.len(), FACTOR_COUNT);
        assert_eq!(curves[0].evaluate("ACPL", 2.0), Some(5.0));
    }

    #[test]
    fn test_load_dir_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        write_region_fixtures(dir.path(), "LoMidWXXX", "ULAM");
        std::fs::write(dir.path().join("species.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let store = CurveStore::load_dir(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_dir_errors_on_missing_factor() {
        let dir = tempfile::tempdir().unwrap();
        write_region_fixtures(dir.path(), "NoEastXXX", "ACPL");
        std::fs::remove_file(dir.path().join("output__NoEastXXX__bvoc.csv")).unwrap();

        let err = CurveStore::load_dir(dir.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("NoEastXXX"), "{msg}");
        assert!(msg.contains("bvoc"), "{msg}");
    }

    #[test]
    fn test_load_dir_errors_on_bad_number() {
        let dir = tempfile::tempdir().unwrap();
        write_region_fixtures(dir.path(), "NoEastXXX", "ACPL");
        let path = dir.path().join("output__NoEastXXX__electricity.csv");
        std::fs::write(&path, ",1.0,3.0\nACPL,four,6.0\n").unwrap();

        let err = CurveStore::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("four"));
    }

    #[test]
    fn test_curve_file_skips_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output__R__bvoc.csv");
        std::fs::write(&path, ",1.0,3.0\nGOOD,4.0,6.0\nSHORT,4.0\n").unwrap();

        let curve = load_curve_file(&path).unwrap();
        assert!(curve.evaluate("GOOD", 2.0).is_some());
        assert!(curve.evaluate("SHORT", 2.0).is_none());
    }

    #[test]
    fn test_curve_file_tolerates_trailing_empty_header_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output__R__bvoc.csv");
        std::fs::write(&path, ",1.0,3.0,,\nGOOD,4.0,6.0\n").unwrap();

        let curve = load_curve_file(&path).unwrap();
        assert_eq!(curve.breaks(), &[1.0, 3.0]);
    }

    #[test]
    fn test_codes_by_region_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for factor in Factor::ALL {
            let path = dir
                .path()
                .join(format!("output__R__{}.csv", factor));
            std::fs::write(path, ",1.0,3.0\nZZ,1.0,2.0\nAA,3.0,4.0\n").unwrap();
        }
        let store = CurveStore::load_dir(dir.path()).unwrap();
        let codes = store.codes_by_region();
        assert_eq!(codes["R"], vec!["AA".to_string(), "ZZ".to_string()]);
    }

    #[test]
    fn test_store_new_rejects_wrong_arity() {
        let mut regions = HashMap::new();
        regions.insert("R".to_string(), Vec::new());
        let err = CurveStore::new(regions).unwrap_err();
        assert!(err.to_string().contains("expected 15"));
    }

    #[test]
    fn test_load_species_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("species.json");
        std::fs::write(&path, r#"{"NoEastXXX": {"MASO": "BDS OTHER"}}"#).unwrap();

        let map = load_species_map(&path).unwrap();
        assert_eq!(map["NoEastXXX"]["MASO"], "BDS OTHER");
    }

    #[test]
    fn test_load_species_map_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("species.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_species_map(&path).is_err());
    }
}
