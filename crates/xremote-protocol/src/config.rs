/// Protocol version emitted on every envelope.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Default upper bound on a single message: 1 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Controls message building and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Version written on outgoing envelopes and checked on incoming ones.
    pub protocol_version: String,
    /// When true, envelopes without a `version` attribute are rejected.
    pub require_version: bool,
    /// Messages longer than this many bytes are rejected.
    pub max_message_size: usize,
    /// Timeout used by builders when the caller does not set one.
    pub default_timeout_secs: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            require_version: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
