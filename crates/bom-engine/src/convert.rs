//! 내장 BOM 변환기
//!
//! 매니페스트의 최상위 부품(`parts`)과 자유 형식 하위 부품(`sub_parts`)을
//! [`BillOfMaterials`]로 변환합니다. BOM 이름은 매니페스트 제목입니다.
//!
//! 내장 BOM은 대체 경로이므로 실패하지 않습니다. 형식이 어긋난 항목은
//! 기본값으로 채워 최대한 변환하고, 변환할 수 없는 항목만 건너뜁니다.

use serde_json::{Map, Value};
use tracing::debug;

use crate::manifest::{Manifest, PartSpec};
use crate::types::{
    BillOfMaterials, Component, ComponentReference, DEFAULT_QUANTITY, DEFAULT_UNIT,
    generate_component_id,
};

/// 수량/단위 오버라이드 키 (`manufacturing_params` 안)
const QUANTITY_KEY: &str = "quantity";
const UNIT_KEY: &str = "unit";

/// 하위 부품 목록으로 인식하는 키
const NESTED_KEYS: [&str; 2] = ["sub_parts", "sub_components"];

/// 요구사항으로 옮기는 하위 부품 키
const REQUIREMENT_KEYS: [&str; 3] = ["material", "outer_dimensions", "mass"];

/// 내장 BOM 변환기
pub struct EmbeddedBomConverter;

impl EmbeddedBomConverter {
    /// 매니페스트의 내장 부품을 BOM으로 변환합니다.
    ///
    /// 최상위 부품이 먼저, 하위 부품이 그 뒤에 선언 순서대로 놓입니다.
    pub fn convert(manifest: &Manifest) -> BillOfMaterials {
        let mut bom = BillOfMaterials::new(manifest.title.clone());

        bom.components
            .extend(manifest.parts.iter().map(Self::convert_part));
        bom.components
            .extend(manifest.sub_parts.iter().filter_map(Self::convert_sub_part));

        bom
    }

    /// OKH 부품 하나를 컴포넌트로 변환합니다.
    pub fn convert_part(part: &PartSpec) -> Component {
        let mut component = Component::new(part.name.clone());
        if let Some(id) = part.id.as_deref().filter(|id| !id.is_empty()) {
            component.id = id.to_owned();
        }

        let mut params = part.manufacturing_params.clone();
        if let Some(quantity) = params.remove(QUANTITY_KEY).as_ref().and_then(as_quantity) {
            component.quantity = quantity;
        }
        if let Some(Value::String(unit)) = params.remove(UNIT_KEY) {
            component.unit = unit;
        }

        let requirements = [
            ("material", &part.material),
            ("outer_dimensions", &part.outer_dimensions),
            ("mass", &part.mass),
        ];
        for (key, value) in requirements {
            if let Some(value) = value {
                component.requirements.insert(key.to_owned(), value.clone());
            }
        }

        let lists = [
            ("tsdc", &part.tsdc),
            ("source", &part.source),
            ("export", &part.export),
        ];
        for (key, list) in lists {
            if !list.is_empty() {
                component
                    .metadata
                    .insert(key.to_owned(), Value::from(list.clone()));
            }
        }

        if !params.is_empty() {
            component
                .metadata
                .insert("manufacturing_params".to_owned(), Value::Object(params));
        }

        component
    }

    /// 자유 형식 하위 부품 항목 하나를 컴포넌트로 변환합니다.
    ///
    /// 문자열은 이름만 가진 컴포넌트가 되고, 매핑/문자열이 아닌 값은 건너뜁니다.
    /// 참조를 가진 항목의 중첩 하위 부품은 로컬 하위 조립품으로 확장하지 않고
    /// `metadata`에 원본 그대로 보존합니다.
    pub fn convert_sub_part(value: &Value) -> Option<Component> {
        let mut entry = match value {
            Value::Object(map) => map.clone(),
            Value::String(name) => return Some(Component::new(name.clone())),
            other => {
                debug!(entry = %other, "skipping sub-part entry that is not a mapping");
                return None;
            }
        };

        let name = match entry.remove("name") {
            Some(Value::String(name)) => name,
            Some(other) if !other.is_null() => other.to_string(),
            _ => String::new(),
        };
        let mut component = Component::new(name);

        if let Some(id) = entry.remove("id") {
            match id {
                Value::String(id) if !id.is_empty() => component.id = id,
                Value::Number(n) => component.id = n.to_string(),
                _ => component.id = generate_component_id(),
            }
        }

        component.quantity = entry
            .remove(QUANTITY_KEY)
            .as_ref()
            .and_then(as_quantity)
            .unwrap_or(DEFAULT_QUANTITY);
        component.unit = match entry.remove(UNIT_KEY) {
            Some(Value::String(unit)) => unit,
            _ => DEFAULT_UNIT.to_owned(),
        };

        component.reference = entry
            .remove("reference")
            .and_then(ComponentReference::from_value);

        for key in NESTED_KEYS {
            let Some(nested) = entry.remove(key) else {
                continue;
            };
            if component.has_reference() {
                component.metadata.insert(key.to_owned(), nested);
                continue;
            }
            match nested {
                Value::Array(items) => component
                    .sub_components
                    .extend(items.iter().filter_map(Self::convert_sub_part)),
                other => {
                    component.sub_components.extend(Self::convert_sub_part(&other));
                }
            }
        }

        if let Some(Value::Object(requirements)) = entry.remove("requirements") {
            component.requirements.extend(requirements);
        }
        for key in REQUIREMENT_KEYS {
            if let Some(value) = entry.remove(key).filter(|v| !v.is_null()) {
                component.requirements.insert(key.to_owned(), value);
            }
        }

        match entry.remove("metadata") {
            Some(Value::Object(metadata)) => component.metadata.extend(metadata),
            Some(other) if !other.is_null() => {
                component.metadata.insert("metadata".to_owned(), other);
            }
            _ => {}
        }

        fold_remaining(&mut component.metadata, entry);
        Some(component)
    }
}

/// 소비되지 않은 키를 메타데이터로 옮깁니다. 기존 값은 덮어쓰지 않습니다.
fn fold_remaining(metadata: &mut Map<String, Value>, remaining: Map<String, Value>) {
    for (key, value) in remaining {
        metadata.entry(key).or_insert(value);
    }
}

/// 숫자 또는 숫자 문자열을 수량으로 해석합니다.
fn as_quantity(value: &Value) -> Option<f64> {
    let quantity = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    quantity.is_finite().then_some(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bom_name_is_manifest_title() {
        let bom = EmbeddedBomConverter::convert(&Manifest::new("Open Microscope"));
        assert_eq!(bom.name, "Open Microscope");
        assert!(bom.is_empty());
    }

    #[test]
    fn part_defaults() {
        let component = EmbeddedBomConverter::convert_part(&PartSpec::new("Housing"));
        assert_eq!(component.name, "Housing");
        assert_eq!(component.quantity, 1.0);
        assert_eq!(component.unit, "pieces");
        assert!(component.requirements.is_empty());
        assert!(component.metadata.is_empty());
    }

    #[test]
    fn part_manufacturing_params_override_quantity() {
        let mut part = PartSpec::new("Screw");
        part.manufacturing_params
            .insert("quantity".to_owned(), json!("12"));
        part.manufacturing_params.insert("unit".to_owned(), json!("pcs"));
        part.manufacturing_params
            .insert("infill".to_owned(), json!("20%"));

        let component = EmbeddedBomConverter::convert_part(&part);
        assert_eq!(component.quantity, 12.0);
        assert_eq!(component.unit, "pcs");
        assert_eq!(component.metadata["manufacturing_params"], json!({ "infill": "20%" }));
    }

    #[test]
    fn part_requirements_and_metadata() {
        let part: PartSpec = serde_json::from_value(json!({
            "name": "Stage",
            "id": "stage-1",
            "material": "PLA",
            "outer_dimensions": { "width": 40, "height": 10, "depth": 40 },
            "mass": 12.5,
            "tsdc": ["3DP"],
            "source": "cad/stage.scad",
            "export": ["stl/stage.stl"]
        }))
        .unwrap();

        let component = EmbeddedBomConverter::convert_part(&part);
        assert_eq!(component.id, "stage-1");
        assert_eq!(component.requirements["material"], "PLA");
        assert_eq!(component.requirements["mass"], 12.5);
        assert_eq!(component.requirements["outer_dimensions"]["width"], 40);
        assert_eq!(component.metadata["tsdc"], json!(["3DP"]));
        assert_eq!(component.metadata["source"], json!(["cad/stage.scad"]));
        assert_eq!(component.metadata["export"], json!(["stl/stage.stl"]));
    }

    #[test]
    fn sub_parts_nest_recursively() {
        let value = json!({
            "id": "optics",
            "name": "Optics",
            "quantity": 2,
            "sub_parts": [
                { "name": "Lens", "sub_parts": [{ "name": "Coating" }] },
                "Tube"
            ]
        });
        let component = EmbeddedBomConverter::convert_sub_part(&value).unwrap();
        assert_eq!(component.id, "optics");
        assert_eq!(component.quantity, 2.0);
        assert_eq!(component.sub_components.len(), 2);
        assert_eq!(component.sub_components[0].name, "Lens");
        assert_eq!(component.sub_components[0].sub_components[0].name, "Coating");
        assert_eq!(component.sub_components[1].name, "Tube");
    }

    #[test]
    fn sub_part_reference_is_carried_and_not_expanded_locally() {
        let value = json!({
            "name": "Camera",
            "reference": { "path": "camera/okh.yaml" },
            "sub_parts": [{ "name": "Sensor" }]
        });
        let component = EmbeddedBomConverter::convert_sub_part(&value).unwrap();
        assert_eq!(
            component.reference.as_ref().and_then(|r| r.path.as_deref()),
            Some("camera/okh.yaml")
        );
        assert!(component.sub_components.is_empty());
        assert_eq!(component.metadata["sub_parts"], json!([{ "name": "Sensor" }]));
    }

    #[test]
    fn empty_reference_does_not_block_local_expansion() {
        for reference in [json!({}), json!("")] {
            let value = json!({
                "id": "frame",
                "name": "Frame",
                "reference": reference,
                "sub_parts": [{ "id": "bracket", "name": "Bracket" }]
            });
            let component = EmbeddedBomConverter::convert_sub_part(&value).unwrap();
            assert!(component.reference.is_none());
            assert_eq!(component.sub_components.len(), 1);
            assert_eq!(component.sub_components[0].name, "Bracket");
            assert!(!component.metadata.contains_key("sub_parts"));
            assert!(!component.metadata.contains_key("reference"));
        }
    }

    #[test]
    fn sub_part_leftover_keys_become_metadata() {
        let value = json!({
            "name": "Knob",
            "material": "ABS",
            "supplier": "acme",
            "metadata": { "color": "black" }
        });
        let component = EmbeddedBomConverter::convert_sub_part(&value).unwrap();
        assert_eq!(component.requirements["material"], "ABS");
        assert_eq!(component.metadata["supplier"], "acme");
        assert_eq!(component.metadata["color"], "black");
        assert!(!component.metadata.contains_key("name"));
    }

    #[test]
    fn malformed_sub_part_fields_default() {
        let value = json!({ "name": 7, "quantity": "lots", "unit": 3, "id": null });
        let component = EmbeddedBomConverter::convert_sub_part(&value).unwrap();
        assert_eq!(component.name, "7");
        assert_eq!(component.quantity, 1.0);
        assert_eq!(component.unit, "pieces");
        assert!(!component.id.is_empty());
    }

    #[test]
    fn non_mapping_sub_parts_are_skipped() {
        assert!(EmbeddedBomConverter::convert_sub_part(&json!(42)).is_none());
        assert!(EmbeddedBomConverter::convert_sub_part(&json!(null)).is_none());
    }

    #[test]
    fn convert_orders_parts_before_sub_parts() {
        let mut manifest = Manifest::new("Printer");
        manifest.parts.push(PartSpec::new("Housing"));
        manifest.parts.push(PartSpec::new("Frame"));
        manifest.sub_parts.push(json!({ "name": "Extruder" }));
        manifest.sub_parts.push(json!(false));

        let bom = EmbeddedBomConverter::convert(&manifest);
        let names: Vec<_> = bom.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Housing", "Frame", "Extruder"]);
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(as_quantity(&json!(3)), Some(3.0));
        assert_eq!(as_quantity(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(as_quantity(&json!("NaN")), None);
        assert_eq!(as_quantity(&json!([1])), None);
    }
}
