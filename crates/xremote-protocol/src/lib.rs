//! The xremote request/reply control protocol.
//!
//! Messages are XML documents with an `envelope` root wrapping exactly one
//! `request` or `reply` body:
//!
//! ```text
//! <envelope version="1.0">
//!   <request id="123" command="zoom_to" timeout="30"> ... body ... </request>
//! </envelope>
//! <envelope version="1.0">
//!   <reply id="123" command="zoom_to" return_code="ok" reason="done"> ... body ... </reply>
//! </envelope>
//! ```
//!
//! This crate builds and checks messages. It holds no channel state; the
//! one-command-at-a-time discipline lives in `xremote-peer`.

pub mod codec;
pub mod codes;
pub mod config;
pub mod error;
pub mod id;
pub mod message;
pub mod validator;

pub use codec::{
    create_reply_from_request, create_request, peek_identity, OutgoingRequest, ReplyBuilder,
    RequestBuilder,
};
pub use codes::{CommandRc, ValidateRc};
pub use config::{ProtocolConfig, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_TIMEOUT_SECS, PROTOCOL_VERSION};
pub use error::{ProtocolError, Result, ValidationError};
pub use id::{IdGenerator, RequestId};
pub use message::{BodyKind, Envelope, Message, Reply, Request};
pub use validator::{validate_envelope, validate_reply, validate_request, Validator};
