//! WebSocket-Over-HTTP wire layer: event codec and per-request context

pub mod context;
pub mod event;

pub use context::{ConnectionContext, ConnectionHandler, OpenResponse, ReplayOutput, replay_events};
pub use event::{WireEvent, decode_events, encode_events};
