#![no_main]

use libfuzzer_sys::fuzz_target;
use tarif::EngineConfig;
use tarif::engine::{PricingEngine, PricingSnapshot};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Errors are fine, panics are bugs.
        if let Ok(snapshot) = PricingSnapshot::from_json(s) {
            let _ = PricingEngine::new(snapshot, EngineConfig::default());
        }
    }
});
