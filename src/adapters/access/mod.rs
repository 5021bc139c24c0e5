//! Permissions backend adapters.

mod postgres;
mod stub;

pub use postgres::PostgresAccessChecker;
pub use stub::StubAccessChecker;
