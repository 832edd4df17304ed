mod code;
mod region;

pub use code::{CodeResolver, OverrideMap};
pub use region::{parse_wkt, Region, RegionResolver};
