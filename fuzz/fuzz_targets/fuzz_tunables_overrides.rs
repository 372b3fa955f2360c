#![no_main]
use libfuzzer_sys::fuzz_target;
use shooter_config::{DEFAULTS, Tunables};

fuzz_target!(|data: &str| {
    let mut t = Tunables::defaults();
    let report = t.apply_overrides(data);
    // Overrides replace values; they never add or drop names.
    assert_eq!(t.len(), DEFAULTS.len());
    assert!(report.applied <= data.lines().count());
    for (name, _) in DEFAULTS {
        assert!(t.get(name).is_some());
    }
});
