//! Application layer - the relay service orchestrating ports and domain.

mod relay;

pub use relay::ChatRelay;
