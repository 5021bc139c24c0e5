//! Event queue adapters.
//!
//! - `RedisEventQueue` - Production consumption from a Redis pub/sub channel
//! - `InMemoryEventQueue` - Synchronous, deterministic delivery for tests

mod in_memory;
mod redis;

pub use in_memory::InMemoryEventQueue;
pub use self::redis::RedisEventQueue;
