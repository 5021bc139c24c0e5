//! Session store adapters.

mod redis;

pub use self::redis::RedisSessionResolver;
