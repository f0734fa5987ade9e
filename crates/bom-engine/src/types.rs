//! 도메인 타입 -- BOM 전개 전용 데이터 구조
//!
//! 컴포넌트, BOM, 컴포넌트 참조, 전개 결과(`ComponentMatch`) 등 핵심 타입을 정의합니다.
//! [`Component`]의 serde 형태는 외부 BOM 파일의 컴포넌트 항목 형식과 동일합니다.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::manifest::Manifest;

/// 기본 수량
pub const DEFAULT_QUANTITY: f64 = 1.0;

/// 기본 단위
pub const DEFAULT_UNIT: &str = "pieces";

/// 새 컴포넌트 ID를 생성합니다.
pub fn generate_component_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_quantity() -> f64 {
    DEFAULT_QUANTITY
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_owned()
}

/// 다른 매니페스트를 가리키는 컴포넌트 참조
///
/// `okh_id`, `path`, `url` 중 하나를 담는 매핑입니다. 인식되지 않는 키는
/// `extra`에 그대로 보존되어, 해석 실패 시 원본 값을 진단 정보로 돌려줄 수 있습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentReference {
    /// 매니페스트 ID (UUID 문자열)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub okh_id: Option<String>,
    /// 매니페스트 파일 경로 (절대 경로 또는 기준 경로에 대한 상대 경로)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// URL (예약됨, 현재 항상 해석 불가)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 인식되지 않은 나머지 키
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentReference {
    /// 매니페스트 ID 참조를 생성합니다.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            okh_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// 파일 경로 참조를 생성합니다.
    pub fn by_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// 임의의 JSON 값에서 참조를 만듭니다.
    ///
    /// 매핑이 아닌 값(문자열 등)은 `extra["value"]`로 보존되며,
    /// 인식 가능한 키가 없으므로 해석 시 "지원하지 않는 참조 형식"이 됩니다.
    /// 빈 값(`null`, `{}`, `[]`, 공백 문자열, `false`, `0`)은 참조 없음으로 취급합니다.
    pub fn from_value(value: Value) -> Option<Self> {
        if is_empty_value(&value) {
            return None;
        }
        match value {
            Value::Object(map) => {
                let raw = Value::Object(map);
                match serde_json::from_value::<Self>(raw.clone()) {
                    Ok(reference) => Some(reference),
                    // okh_id 등이 문자열이 아닌 경우: 원본 전체를 extra로 보존
                    Err(_) => {
                        let Value::Object(map) = raw else {
                            return None;
                        };
                        Some(Self {
                            extra: map,
                            ..Self::default()
                        })
                    }
                }
            }
            other => {
                let mut extra = Map::new();
                extra.insert("value".to_owned(), other);
                Some(Self {
                    extra,
                    ..Self::default()
                })
            }
        }
    }

    /// 인식 가능한 키(`okh_id`, `path`, `url`)가 하나라도 있는지 확인합니다.
    pub fn has_recognized_key(&self) -> bool {
        self.okh_id.is_some() || self.path.is_some() || self.url.is_some()
    }

    /// 원본 형태의 JSON 값으로 변환합니다.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ComponentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref id) = self.okh_id {
            write!(f, "okh_id:{id}")
        } else if let Some(ref path) = self.path {
            write!(f, "path:{path}")
        } else if let Some(ref url) = self.url {
            write!(f, "url:{url}")
        } else {
            write!(f, "{}", Value::Object(self.extra.clone()))
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// `reference` 필드를 관대하게 역직렬화합니다 (매핑이 아니어도 실패하지 않음).
fn lenient_reference<'de, D>(deserializer: D) -> Result<Option<ComponentReference>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(ComponentReference::from_value))
}

/// 부품 계층의 한 노드
///
/// 참조(`reference`)를 가진 컴포넌트는 내장 하위 조립품으로 직접 확장되지 않고,
/// 참조된 매니페스트의 BOM을 재귀적으로 해석하여 자식을 얻습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// 안정적인 식별자 (없으면 생성)
    #[serde(default = "generate_component_id")]
    pub id: String,
    /// 사람이 읽을 수 있는 이름
    #[serde(default)]
    pub name: String,
    /// 수량
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    /// 단위
    #[serde(default = "default_unit")]
    pub unit: String,
    /// 외부 매니페스트 참조
    #[serde(
        default,
        deserialize_with = "lenient_reference",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference: Option<ComponentReference>,
    /// 내장 하위 컴포넌트 (다단계 내장 BOM)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_components: Vec<Component>,
    /// 요구사항 (재질, 치수, 질량 등)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub requirements: Map<String, Value>,
    /// 자유 형식 메타데이터
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Component {
    /// 이름만 지정하여 기본값을 가진 컴포넌트를 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_component_id(),
            name: name.into(),
            quantity: DEFAULT_QUANTITY,
            unit: default_unit(),
            reference: None,
            sub_components: Vec::new(),
            requirements: Map::new(),
            metadata: Map::new(),
        }
    }

    /// ID를 지정합니다.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// 수량과 단위를 지정합니다.
    pub fn with_quantity(mut self, quantity: f64, unit: impl Into<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    /// 외부 매니페스트 참조를 지정합니다.
    pub fn with_reference(mut self, reference: ComponentReference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// 하위 컴포넌트를 추가합니다.
    pub fn with_sub_component(mut self, child: Component) -> Self {
        self.sub_components.push(child);
        self
    }

    /// 참조를 가지고 있는지 확인합니다.
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{} {}", self.name, self.quantity, self.unit)
    }
}

/// 이름이 있는 순서 보존 컴포넌트 목록
///
/// 컴포넌트 순서는 삽입 순서이며, 순회 결정성 외의 의미는 없습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    /// BOM 이름
    #[serde(default)]
    pub name: String,
    /// 최상위 컴포넌트 목록
    #[serde(default)]
    pub components: Vec<Component>,
    /// 자유 형식 메타데이터
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl BillOfMaterials {
    /// 빈 BOM을 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// 컴포넌트 하나만 담은 BOM을 생성합니다 (하위 컴포넌트 재귀 전개용).
    pub fn singleton(component: Component) -> Self {
        Self {
            name: component.name.clone(),
            components: vec![component],
            metadata: Map::new(),
        }
    }

    /// 최상위 컴포넌트 수를 반환합니다.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// 최상위 컴포넌트가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// ID로 최상위 컴포넌트를 검색합니다.
    pub fn find_component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// 메타데이터 값을 설정합니다.
    pub fn set_metadata(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_owned(), value.into());
    }
}

impl fmt::Display for BillOfMaterials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BillOfMaterials({}, {} components)",
            self.name,
            self.components.len()
        )
    }
}

/// 전개 엔진의 출력 단위
///
/// 컴포넌트와 그 깊이, 부모, 루트로부터의 이름 경로, 참조 해석 상태를 담습니다.
/// `depth == path.len() - 1`이 항상 성립합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMatch {
    /// 감싼 컴포넌트
    pub component: Component,
    /// 깊이 (0 = 최상위)
    pub depth: usize,
    /// 부모 컴포넌트 ID (최상위는 None)
    pub parent_id: Option<String>,
    /// 루트부터 이 노드까지의 컴포넌트 이름 경로
    pub path: Vec<String>,
    /// 참조 해석에 성공한 경우 해당 매니페스트
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_manifest: Option<Box<Manifest>>,
    /// 설비 매칭 단계에서 사용하는 플래그 (엔진은 설정하지 않음)
    #[serde(default)]
    pub matched: bool,
    /// 하위 단계가 채우는 supply tree 산출물 (엔진은 설정하지 않음)
    #[serde(default)]
    pub supply_trees: Vec<Value>,
    /// 해석되지 않은 참조가 있었는지 여부
    #[serde(default)]
    pub has_unresolved_reference: bool,
    /// 해석 실패 시의 원본 참조 값
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unresolved_reference: Option<ComponentReference>,
}

impl ComponentMatch {
    /// 새 전개 결과를 생성합니다.
    pub fn new(
        component: Component,
        depth: usize,
        parent_id: Option<String>,
        path: Vec<String>,
    ) -> Self {
        Self {
            component,
            depth,
            parent_id,
            path,
            resolved_manifest: None,
            matched: false,
            supply_trees: Vec::new(),
            has_unresolved_reference: false,
            unresolved_reference: None,
        }
    }

    /// 해석되지 않은 참조를 기록합니다.
    pub fn mark_unresolved(&mut self, reference: ComponentReference) {
        self.has_unresolved_reference = true;
        self.unresolved_reference = Some(reference);
    }

    /// 최상위 결과인지 확인합니다.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// 이름 경로를 `A > B > C` 형태로 반환합니다.
    pub fn path_display(&self) -> String {
        self.path.join(" > ")
    }
}

impl fmt::Display for ComponentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.depth, self.path_display())?;
        if self.has_unresolved_reference {
            write!(f, " (unresolved)")?;
        }
        Ok(())
    }
}
