//! Core data model: agent state, messages, and the event stream protocol.

mod state;
pub use state::*;

mod messages;
pub use messages::*;

mod events;
pub use events::*;
