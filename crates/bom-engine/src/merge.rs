//! 외부 BOM과 내장 BOM 병합
//!
//! 내장 컴포넌트를 먼저 (ID 중복 제거), 그 뒤에 아직 등장하지 않은 ID의
//! 외부 컴포넌트를 붙입니다. 같은 BOM끼리 병합하면 원래 컴포넌트 수가 유지됩니다.

use std::collections::HashSet;

use crate::types::BillOfMaterials;

/// 병합 결과의 `source` 메타데이터 값
pub const MERGED_SOURCE: &str = "external_and_embedded";

/// 내장 BOM과 외부 BOM을 병합합니다.
///
/// 내장 BOM이 비어 있으면 외부 BOM을 메타데이터까지 그대로 반환합니다.
/// 병합된 BOM은 외부 BOM의 이름과 메타데이터를 기반으로 하며,
/// `source`, `embedded_count`, `external_count`를 기록합니다.
pub fn merge_boms(embedded: BillOfMaterials, external: BillOfMaterials) -> BillOfMaterials {
    if embedded.is_empty() {
        return external;
    }

    let embedded_count = embedded.component_count();
    let external_count = external.component_count();

    let mut seen = HashSet::with_capacity(embedded_count + external_count);
    let mut components = Vec::with_capacity(embedded_count + external_count);

    for component in embedded.components.into_iter().chain(external.components) {
        if seen.insert(component.id.clone()) {
            components.push(component);
        }
    }

    let name = if external.name.is_empty() {
        embedded.name
    } else {
        external.name
    };

    let mut merged = BillOfMaterials {
        name,
        components,
        metadata: external.metadata,
    };
    merged.set_metadata("source", MERGED_SOURCE);
    merged.set_metadata("embedded_count", embedded_count);
    merged.set_metadata("external_count", external_count);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Component;
    use proptest::prelude::*;

    fn bom(name: &str, ids: &[&str]) -> BillOfMaterials {
        let mut bom = BillOfMaterials::new(name);
        for id in ids {
            bom.components.push(Component::new(*id).with_id(*id));
        }
        bom
    }

    fn ids(bom: &BillOfMaterials) -> Vec<&str> {
        bom.components.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn embedded_first_then_unseen_external() {
        let merged = merge_boms(bom("M", &["a", "b"]), bom("ext", &["b", "c", "d"]));
        assert_eq!(ids(&merged), vec!["a", "b", "c", "d"]);
        assert_eq!(merged.name, "ext");
        assert_eq!(merged.metadata["source"], MERGED_SOURCE);
        assert_eq!(merged.metadata["embedded_count"], 2);
        assert_eq!(merged.metadata["external_count"], 3);
    }

    #[test]
    fn embedded_component_wins_on_collision() {
        let mut embedded = bom("M", &["x"]);
        embedded.components[0].name = "Inline".to_owned();
        let mut external = bom("ext", &["x"]);
        external.components[0].name = "External".to_owned();

        let merged = merge_boms(embedded, external);
        assert_eq!(merged.component_count(), 1);
        assert_eq!(merged.components[0].name, "Inline");
    }

    #[test]
    fn empty_embedded_returns_external_unmodified() {
        let mut external = bom("ext", &["a"]);
        external.set_metadata("revision", "C");
        let merged = merge_boms(BillOfMaterials::new("M"), external.clone());
        assert_eq!(merged, external);
    }

    #[test]
    fn duplicate_ids_within_embedded_are_dropped() {
        let merged = merge_boms(bom("M", &["a", "a"]), bom("ext", &[]));
        assert_eq!(ids(&merged), vec!["a"]);
        assert_eq!(merged.name, "ext");
    }

    #[test]
    fn unnamed_external_keeps_embedded_name() {
        let merged = merge_boms(bom("Printer", &["a"]), bom("", &["b"]));
        assert_eq!(merged.name, "Printer");
    }

    proptest! {
        #[test]
        fn merge_with_self_keeps_count(n in 1usize..20) {
            let id_strings: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
            let id_refs: Vec<&str> = id_strings.iter().map(String::as_str).collect();
            let original = bom("B", &id_refs);
            let merged = merge_boms(original.clone(), original.clone());
            prop_assert_eq!(merged.component_count(), original.component_count());
        }

        #[test]
        fn merged_count_is_embedded_plus_unseen_external(
            embedded in proptest::collection::hash_set(0u8..32, 1..10),
            external in proptest::collection::hash_set(0u8..32, 0..10),
        ) {
            let e: Vec<String> = embedded.iter().map(|i| format!("c{i}")).collect();
            let x: Vec<String> = external.iter().map(|i| format!("c{i}")).collect();
            let e_refs: Vec<&str> = e.iter().map(String::as_str).collect();
            let x_refs: Vec<&str> = x.iter().map(String::as_str).collect();

            let expected = embedded.len() + external.difference(&embedded).count();
            let merged = merge_boms(bom("E", &e_refs), bom("X", &x_refs));
            prop_assert_eq!(merged.component_count(), expected);
        }
    }
}
