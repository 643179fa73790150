use std::fmt;
use std::io;

use xremote_frame::FrameError;
use xremote_peer::PeerError;
use xremote_protocol::{ProtocolError, ValidationError};
use xremote_xml::XmlError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::PermissionDenied
        | io::ErrorKind::AddrInUse => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn xml_error(context: &str, err: XmlError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn validation_error(context: &str, err: ValidationError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    match err {
        ProtocolError::Xml(err) => xml_error(context, err),
        ProtocolError::InvalidRequest(err) => validation_error(context, err),
        ProtocolError::EmptyCommand
        | ProtocolError::InvalidTimeout
        | ProtocolError::UnknownCode { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidUtf8(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn peer_error(context: &str, err: PeerError) -> CliError {
    match err {
        PeerError::Frame(err) => frame_error(context, err),
        PeerError::Protocol(err) => protocol_error(context, err),
        PeerError::ReplyRejected(err) | PeerError::InvalidRequest(err) => {
            validation_error(context, err)
        }
        PeerError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        PeerError::Disconnected | PeerError::Abandoned { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use xremote_protocol::{RequestId, ValidateRc};

    use super::*;

    #[test]
    fn timeouts_map_to_124() {
        let err = PeerError::Timeout {
            id: RequestId::new(1).unwrap(),
            command: "ping".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(peer_error("send failed", err).code, TIMEOUT);
        assert_eq!(
            io_error("connect", io::Error::from(io::ErrorKind::TimedOut)).code,
            TIMEOUT
        );
    }

    #[test]
    fn bad_data_maps_to_data_invalid() {
        let rejected = PeerError::ReplyRejected(ValidationError::new(
            ValidateRc::BodyContent,
            "reply id 8 does not match request id 7",
        ));
        assert_eq!(peer_error("send failed", rejected).code, DATA_INVALID);
        assert_eq!(
            protocol_error("reply", ProtocolError::Xml(XmlError::MisplacedText)).code,
            DATA_INVALID
        );
    }

    #[test]
    fn caller_mistakes_map_to_usage() {
        let err = PeerError::Protocol(ProtocolError::EmptyCommand);
        assert_eq!(peer_error("send failed", err).code, USAGE);
    }

    #[test]
    fn message_keeps_context() {
        let err = peer_error("send failed", PeerError::Disconnected);
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.to_string(), "send failed: peer disconnected");
    }
}
