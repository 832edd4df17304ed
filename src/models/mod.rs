mod benefit;
mod factor;
mod row;

pub use benefit::{BenefitSummary, BenefitVector, FullBenefits, ScenarioResult};
pub use factor::{Factor, FACTOR_COUNT};
pub use row::{RowFilter, RowLocation, RowSource, TreeRow, VecRowSource, CENTIMETERS_PER_INCH};
