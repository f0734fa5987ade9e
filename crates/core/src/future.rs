//! dyn 호환 async trait 지원

use std::future::Future;
use std::pin::Pin;

/// `Send` 가능한 boxed future
///
/// `async fn`을 가진 trait은 `dyn`으로 사용할 수 없으므로,
/// trait 객체가 필요한 확장 포인트는 이 타입을 반환합니다.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
