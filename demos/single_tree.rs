//! Single-tree calculation example: load a curve data directory, resolve a
//! growth-curve code, and print the benefit table.
//!
//! Run from the project root:
//!   cargo run --example single_tree -- <data-dir>

use eco_benefits::models::{BenefitSummary, CENTIMETERS_PER_INCH};
use eco_benefits::report::print_summary_table;
use eco_benefits::EcoSnapshot;

fn main() {
    let data_dir = std::env::args()
        .nth(1)
        .expect("usage: single_tree <data-dir>");

    let snapshot = EcoSnapshot::load(&data_dir).expect("failed to load curve data");
    println!(
        "Loaded curve data for {} region(s)",
        snapshot.curves.len()
    );

    let region = snapshot
        .curves
        .region_codes()
        .next()
        .expect("data directory has no regions")
        .to_string();
    let codes = snapshot.curves.codes_by_region();
    let code = codes[&region].first().expect("region has no codes").clone();

    let benefits = snapshot
        .engine()
        .benefits_for_tree(&region, &code, 11.0 * CENTIMETERS_PER_INCH)
        .expect("calculation failed");

    println!("Benefits for an 11\" {code} in {region}:");
    print_summary_table(&BenefitSummary {
        benefits,
        n_trees: 1,
    });
}
