//! Relay domain - Rooms, queued event messages, and the wire protocol.
//!
//! - `room` - Room key and qualified event name construction
//! - `message` - Queued event messages consumed from the backend queue
//! - `protocol` - JSON messages exchanged with connected clients

mod message;
mod protocol;
mod room;

pub use message::{EventRouting, QueuedEventMessage};
pub use protocol::{ClientMessage, ServerMessage};
pub use room::{qualified_event_name, RoomKey};
