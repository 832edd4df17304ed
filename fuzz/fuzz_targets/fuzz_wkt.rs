#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(region) = eco_benefits::resolve::Region::from_wkt("fuzz", text) {
            let _ = region.contains(0.0, 0.0);
        }
    }
});
