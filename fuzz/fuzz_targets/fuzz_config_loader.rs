#![no_main]
use libfuzzer_sys::fuzz_target;

// Arbitrary TOML must either fail to parse or yield a config whose validation and derived
// period never panic.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = shooter_config::load_toml(data) {
        if cfg.validate().is_ok() {
            assert!(cfg.period_s().is_finite() && cfg.period_s() > 0.0);
        }
    }
});
