use xremote_xml::XmlError;

use crate::codes::ValidateRc;

/// Errors raised while building messages or resolving codes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Body content could not be assembled or serialized.
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),

    /// The request a reply should answer is not a valid request.
    #[error("invalid original request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// A request was built without a command name.
    #[error("command name must not be empty")]
    EmptyCommand,

    /// A request was built with a zero timeout.
    #[error("timeout must be at least one second")]
    InvalidTimeout,

    /// A wire token does not name any code in the registry.
    #[error("unknown {registry} code '{token}'")]
    UnknownCode {
        registry: &'static str,
        token: String,
    },
}

/// A message failed validation.
///
/// `code` says where the defect was found; `message` says what it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: ValidateRc,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: ValidateRc, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when the text itself was not well-formed XML.
    pub fn is_xml(&self) -> bool {
        self.code.is_xml()
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
