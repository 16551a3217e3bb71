//! Bus implementations for relayed notifications.
//!
//! The bus abstraction itself lives in `stockpost-events`; the in-process
//! bus is used by default and Redis pub/sub is available behind `redis`.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisPubSubEventBus};
