#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod future;
pub mod logging;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{BomError, BomwalkError, ConfigError};

// 설정
pub use config::{BomConfig, BomwalkConfig, GeneralConfig};

// async trait 지원
pub use future::BoxFuture;

// 로깅
pub use logging::init_tracing;
