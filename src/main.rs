use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use eco_benefits::{
    models::{BenefitSummary, CENTIMETERS_PER_INCH},
    report, EcoSnapshot, Scenario,
};

#[derive(Parser)]
#[command(
    name = "eco-benefits",
    about = "Urban tree eco-benefit calculator",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate benefits for a single tree
    Calc {
        /// Directory with curve CSV files and the species table
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Region code, e.g. NoEastXXX
        #[arg(short, long)]
        region: String,

        /// OTM species code
        #[arg(short, long)]
        otmcode: String,

        /// Diameter at breast height, in inches
        #[arg(long)]
        diameter: f64,

        /// Numeric species id, for instance-level overrides
        #[arg(long, default_value = "0")]
        species_id: i64,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a planting scenario from a JSON file
    Scenario {
        /// Directory with curve CSV files and the species table
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Scenario description (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List the growth-curve codes available per region
    Codes {
        /// Directory with curve CSV files and the species table
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Limit the listing to one region
        #[arg(short, long)]
        region: Option<String>,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API server
    #[cfg(feature = "web")]
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Calc {
            data_dir,
            region,
            otmcode,
            diameter,
            species_id,
            json,
        } => {
            let snapshot = EcoSnapshot::load(&data_dir)?;
            let code = snapshot.resolver.resolve(&otmcode, species_id, &region, 0)?;
            let benefits =
                snapshot
                    .engine()
                    .benefits_for_tree(&region, code, diameter * CENTIMETERS_PER_INCH)?;
            let summary = BenefitSummary {
                benefits,
                n_trees: 1,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "\n{}",
                    format!("{otmcode} ({code}) at {diameter}\" in {region}")
                        .bold()
                        .cyan()
                );
                report::print_summary_table(&summary);
            }
        }

        Commands::Scenario {
            data_dir,
            input,
            json,
        } => {
            let snapshot = EcoSnapshot::load(&data_dir)?;
            let text = std::fs::read_to_string(&input)?;
            let scenario: Scenario = serde_json::from_str(&text)?;
            let result = snapshot.engine().run_scenario(&scenario)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                report::print_scenario_table(&result);
            }
        }

        Commands::Codes {
            data_dir,
            region,
            json,
        } => {
            let snapshot = EcoSnapshot::load(&data_dir)?;
            let mut codes = snapshot.curves.codes_by_region();
            if let Some(region) = region {
                if !codes.contains_key(&region) {
                    anyhow::bail!("no curve data for region {region}");
                }
                codes.retain(|r, _| *r == region);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&codes)?);
            } else {
                report::print_codes_table(&codes);
            }
        }

        #[cfg(feature = "web")]
        Commands::Serve { config, port } => {
            use eco_benefits::backend::SqliteBackend;
            use eco_benefits::Config;
            use std::sync::Arc;

            let mut config = match config {
                Some(path) => Config::load(path)?,
                None => Config::from_env(),
            };
            if let Some(port) = port {
                config.port = port;
            }

            let backend = Arc::new(SqliteBackend::new(config.database.clone()));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(eco_benefits::web::start_server(config, backend))?;
        }
    }

    Ok(())
}
