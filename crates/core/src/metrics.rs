//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. exporter 설치는 임베딩하는 쪽의 몫입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `bomwalk_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(bomwalk_core::metrics::BOM_COMPONENTS_EMITTED_TOTAL).increment(3);
//! ```

use metrics::{describe_counter, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// BOM 출처 레이블 키 (external, embedded, external_and_embedded, ...)
pub const LABEL_SOURCE: &str = "source";

// ─── BOM 엔진 메트릭 ────────────────────────────────────────────────

/// 전개 호출 수 (counter, label: result)
pub const BOM_EXPLOSIONS_TOTAL: &str = "bomwalk_bom_explosions_total";

/// 전개 결과로 생성된 ComponentMatch 수 (counter)
pub const BOM_COMPONENTS_EMITTED_TOTAL: &str = "bomwalk_bom_components_emitted_total";

/// 해석되지 않은 컴포넌트 참조 수 (counter)
pub const BOM_UNRESOLVED_REFERENCES_TOTAL: &str = "bomwalk_bom_unresolved_references_total";

/// 외부 BOM 파일 로딩 수 (counter, label: result)
pub const BOM_EXTERNAL_LOADS_TOTAL: &str = "bomwalk_bom_external_loads_total";

/// BOM 해석 수 (counter, label: source)
pub const BOM_RESOLUTIONS_TOTAL: &str = "bomwalk_bom_resolutions_total";

/// 전개 소요 시간 (histogram, 초)
pub const BOM_EXPLOSION_DURATION_SECONDS: &str = "bomwalk_bom_explosion_duration_seconds";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다. recorder가 없으면 아무 일도 하지 않습니다.
pub fn describe_metrics() {
    describe_counter!(BOM_EXPLOSIONS_TOTAL, "Number of BOM explosion calls");
    describe_counter!(
        BOM_COMPONENTS_EMITTED_TOTAL,
        "Number of component matches emitted by explosions"
    );
    describe_counter!(
        BOM_UNRESOLVED_REFERENCES_TOTAL,
        "Number of component references that could not be resolved"
    );
    describe_counter!(
        BOM_EXTERNAL_LOADS_TOTAL,
        "Number of external BOM file loads"
    );
    describe_counter!(BOM_RESOLUTIONS_TOTAL, "Number of manifest BOM resolutions");
    describe_histogram!(
        BOM_EXPLOSION_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Time spent exploding a bill of materials"
    );
}
