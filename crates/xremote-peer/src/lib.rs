//! Peer-side state for the xremote protocol.
//!
//! A [`Channel`] sends one request at a time over a [`Transport`] and waits
//! for the matching reply. The one-command-in-flight discipline is enforced by
//! the [`Correlator`], which can also be used on its own when the embedding
//! application owns the transport. A [`Responder`] serves the other side.

pub mod channel;
pub mod correlator;
pub mod error;
pub mod responder;
pub mod transport;

pub use channel::{Channel, ChannelConfig, DEFAULT_POLL_INTERVAL};
pub use correlator::{CommandOutcome, CommandState, Correlator, Outstanding};
pub use error::{PeerError, Result};
pub use responder::{serve_one, CommandHandler, HandlerReply, Responder, PING_COMMAND};
pub use transport::{MemoryTransport, StreamTransport, Transport};
