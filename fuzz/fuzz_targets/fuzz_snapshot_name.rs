//! Fuzz target: snapshot name validation.
//!
//! No accepted name may escape the snapshot directory.
#![no_main]

use cubicle_executor::is_valid_snapshot_name;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|name: &str| {
    if is_valid_snapshot_name(name) {
        assert!(!name.contains('/') && !name.contains('\\'), "separator in {name:?}");
        assert!(!name.starts_with('.'), "hidden or relative name {name:?}");
        assert!(name.ends_with(".py"));
    }
});
