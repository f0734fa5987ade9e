#![no_main]

use std::path::Path;

use bomwalk_bom_engine::{BomSourceDetector, EmbeddedBomConverter, Manifest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    for name in ["okh.json", "okh.yaml", "okh.toml"] {
        if let Ok(manifest) = Manifest::parse(text, Path::new(name)) {
            let _ = BomSourceDetector::detect(&manifest);
            let _ = EmbeddedBomConverter::convert(&manifest);
        }
    }
});
