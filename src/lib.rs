pub mod backend;
pub mod cache;
pub mod config;
pub mod curves;
pub mod engine;
pub mod error;
pub mod models;
pub mod report;
pub mod resolve;

#[cfg(feature = "web")]
pub mod web;

pub use cache::{EcoCache, EcoSnapshot};
pub use config::Config;
pub use engine::{BenefitEngine, ScanOptions, Scenario, ScenarioTree};
pub use error::EcoError;
pub use models::{BenefitSummary, BenefitVector, Factor, FullBenefits, ScenarioResult};
