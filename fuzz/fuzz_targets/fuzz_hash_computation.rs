//! Fuzz target: SHA-256 output digest.
//!
//! Verifies that `compute_hash` never panics on arbitrary input and always
//! produces a 64-character hex string.
#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (stdout, stderr) = data.split_at(data.len() / 2);
    let hex = cubicle_executor::compute_hash(stdout, stderr).to_string();
    assert_eq!(hex.len(), 64, "SHA-256 hex must always be 64 chars");
    assert!(
        hex.chars().all(|c| c.is_ascii_hexdigit()),
        "SHA-256 hex must contain only hex digits"
    );
});
