#![no_main]

use bomwalk_bom_engine::EmbeddedBomConverter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 변환 결과의 수량은 항상 유한해야 함
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Some(component) = EmbeddedBomConverter::convert_sub_part(&value) {
            assert!(component.quantity.is_finite());
        }
    }
});
