//! Fuzz target: the `{"code": ...}` body parser behind `/exec2` and `/class/save`.
//!
//! Arbitrary bytes must either parse or produce an invalid-request error.

#![no_main]

use cubicle_gateway::{error::GatewayError, exec::parse_code_body};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match parse_code_body(data) {
        Ok(body) => {
            // Whatever parsed must have come from valid JSON.
            assert!(serde_json::from_slice::<serde_json::Value>(data).is_ok());
            let _ = body.code.len();
        }
        Err(GatewayError::InvalidRequest(_)) => {}
        Err(other) => panic!("unexpected error kind: {other}"),
    }
});
