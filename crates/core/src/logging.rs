//! 로깅 초기화
//!
//! `[general]` 섹션의 `log_level`/`log_format`에 따라 `tracing-subscriber`를
//! 구성합니다. `RUST_LOG` 환경변수가 있으면 설정 레벨보다 우선합니다.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::GeneralConfig;
use crate::error::BomwalkError;

/// 전역 tracing subscriber를 초기화합니다.
///
/// 프로세스당 한 번만 성공합니다. 두 번째 호출은 에러를 반환합니다.
///
/// # Formats
///
/// * `"json"` - JSON lines (운영 환경 기본값)
/// * `"pretty"` - 사람이 읽기 쉬운 출력 (개발용)
pub fn init_tracing(config: &GeneralConfig) -> Result<(), BomwalkError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| {
                BomwalkError::Logging(format!("failed to initialize JSON tracing subscriber: {e}"))
            }),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .map_err(|e| {
                BomwalkError::Logging(format!(
                    "failed to initialize pretty tracing subscriber: {e}"
                ))
            }),
        other => Err(BomwalkError::Logging(format!(
            "unknown log format '{other}', expected 'json' or 'pretty'"
        ))),
    }
}
