#![no_main]

use libfuzzer_sys::fuzz_target;

// The curve parser must reject or accept arbitrary CSV without panicking;
// accepted curves must evaluate without panicking either.
fuzz_target!(|data: &[u8]| {
    if let Ok(curve) = eco_benefits::curves::parse_curve(data) {
        for code in curve.codes() {
            let _ = curve.evaluate(code, 0.0);
            let _ = curve.evaluate(code, 1e6);
        }
    }
});
