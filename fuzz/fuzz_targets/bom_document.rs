#![no_main]

use std::path::Path;

use bomwalk_bom_engine::parse_bom_document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_bom_document(text, Path::new("bom.json"));
        let _ = parse_bom_document(text, Path::new("bom.yaml"));
    }
});
