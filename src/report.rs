use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table,
};

use crate::models::{BenefitSummary, Factor, ScenarioResult};

/// Reporting unit for a factor, as published with the curve datasets.
fn unit(factor: Factor) -> &'static str {
    match factor {
        Factor::NaturalGas => "kBTU",
        Factor::Electricity => "kWh",
        Factor::HydroInterception => "gal",
        _ => "lbs",
    }
}

/// Format an aggregate benefit table as a string.
pub fn format_summary_table(summary: &BenefitSummary) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Eco Benefits".bold().green()));
    output.push_str(&format!(
        "{}\n",
        format!("Trees counted: {}", summary.n_trees).dimmed()
    ));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Factor", "Value", "Unit"]);

    for (factor, value) in summary.benefits.iter() {
        table.add_row(vec![
            Cell::new(factor.name()),
            Cell::new(format!("{value:.4}")),
            Cell::new(unit(factor)),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print an aggregate benefit table.
pub fn print_summary_table(summary: &BenefitSummary) {
    println!("{}", format_summary_table(summary));
}

/// Format scenario results as a year-by-year table, factors across the
/// columns and a grand-total row at the bottom.
pub fn format_scenario_table(result: &ScenarioResult) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Scenario Projection".bold().green()));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec!["Year".to_string()];
    header.extend(Factor::ALL.iter().map(|f| f.name().to_string()));
    table.set_header(header);

    for (year, benefits) in result.years.iter().enumerate() {
        let mut row = vec![Cell::new(year)];
        row.extend(benefits.iter().map(|(_, v)| Cell::new(format!("{v:.3}"))));
        table.add_row(row);
    }

    let mut total_row = vec![Cell::new("Total")];
    total_row.extend(
        result
            .total
            .iter()
            .map(|(_, v)| Cell::new(format!("{v:.3}"))),
    );
    table.add_row(total_row);

    output.push_str(&format!("{table}"));
    output
}

pub fn print_scenario_table(result: &ScenarioResult) {
    println!("{}", format_scenario_table(result));
}

/// Format the growth-curve codes available per region.
pub fn format_codes_table(codes: &BTreeMap<String, Vec<String>>) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Growth-Curve Codes".bold().green()));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Region", "Codes", "Count"]);

    for (region, region_codes) in codes {
        table.add_row(vec![
            Cell::new(region),
            Cell::new(region_codes.join(", ")),
            Cell::new(region_codes.len()),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

pub fn print_codes_table(codes: &BTreeMap<String, Vec<String>>) {
    println!("{}", format_codes_table(codes));
}
