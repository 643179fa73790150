use std::time::Duration;

use xremote_frame::FrameError;
use xremote_protocol::{ProtocolError, RequestId, ValidationError};

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// A message could not be built.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The other side went away.
    #[error("peer disconnected")]
    Disconnected,

    /// A request was sent while another one is still awaiting its reply.
    #[error("command '{command}' (id {id}) is still awaiting a reply")]
    CommandOutstanding { id: RequestId, command: String },

    /// A reply arrived but does not answer the outstanding request.
    ///
    /// The request stays outstanding.
    #[error("reply rejected: {0}")]
    ReplyRejected(ValidationError),

    /// A reply arrived while no command was outstanding.
    #[error("unsolicited reply: {0}")]
    UnsolicitedReply(String),

    /// No reply arrived in time; the command has been dropped.
    #[error("command '{command}' (id {id}) timed out after {timeout:?}")]
    Timeout {
        id: RequestId,
        command: String,
        timeout: Duration,
    },

    /// The command was abandoned before a reply arrived.
    #[error("command '{command}' (id {id}) was abandoned")]
    Abandoned { id: RequestId, command: String },

    /// There is no outstanding command to wait for.
    #[error("no command is outstanding")]
    NotOutstanding,

    /// A received request is invalid and cannot be answered.
    #[error("invalid request: {0}")]
    InvalidRequest(ValidationError),
}

impl From<FrameError> for PeerError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed => PeerError::Disconnected,
            other => PeerError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
