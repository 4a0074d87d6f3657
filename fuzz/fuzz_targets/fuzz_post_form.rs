//! Fuzz target: post form validation.
//!
//! A title is accepted exactly when it has a non-whitespace character.
#![no_main]

use cubicle_core::PostForm;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (String, String)| {
    let (title, body) = data;
    let blank = title.trim().is_empty();
    let form = PostForm::new(title, body);
    assert_eq!(form.validate().is_err(), blank);
});
