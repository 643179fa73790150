//! Structural and content checks for incoming messages.
//!
//! Validation is pure: it never touches channel state. Each entry point
//! returns the parsed message on success or a [`ValidationError`] whose code
//! says where the defect sits:
//!
//! | defect | code |
//! |---|---|
//! | not well-formed, inside the body | `body_xml` |
//! | not well-formed, anywhere else | `envelope_xml` |
//! | wrong root, stray text, zero or several children, bad version, oversize | `envelope_content` |
//! | missing or empty `command` | `body_command` |
//! | wrong body kind, bad `id`/`timeout`/`return_code`, reply not answering the request | `body_content` |

use xremote_xml::{Element, XmlError};

use crate::codes::{CommandRc, ValidateRc};
use crate::config::ProtocolConfig;
use crate::error::ValidationError;
use crate::id::RequestId;
use crate::message::{
    BodyKind, Envelope, Message, Reply, Request, ATTR_COMMAND, ATTR_ID, ATTR_REASON,
    ATTR_RETURN_CODE, ATTR_TIMEOUT, ATTR_VERSION, ENVELOPE_TAG,
};

type Checked<T> = std::result::Result<T, ValidationError>;

/// Validates messages against one [`ProtocolConfig`].
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ProtocolConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Check that `text` is one `envelope` wrapping exactly one `request` or `reply`.
    pub fn validate_envelope(&self, text: &str) -> Checked<Envelope> {
        if text.len() > self.config.max_message_size {
            return Err(ValidationError::new(
                ValidateRc::EnvelopeContent,
                format!(
                    "message is {} bytes, limit is {}",
                    text.len(),
                    self.config.max_message_size
                ),
            ));
        }

        let root = Element::parse(text).map_err(xml_failure)?;

        if root.name() != ENVELOPE_TAG {
            return Err(envelope_content(format!(
                "root element is <{}>, expected <{ENVELOPE_TAG}>",
                root.name()
            )));
        }

        let version = root.attribute(ATTR_VERSION).map(str::to_string);
        self.check_version(version.as_deref())?;

        if root.has_text() {
            return Err(envelope_content("envelope contains text outside the body"));
        }

        let mut children = root.child_elements();
        let body = children
            .next()
            .ok_or_else(|| envelope_content("envelope has no body element"))?;
        if children.next().is_some() {
            return Err(envelope_content("envelope has more than one body element"));
        }
        if BodyKind::from_tag(body.name()).is_none() {
            return Err(envelope_content(format!(
                "unrecognised body element <{}>",
                body.name()
            )));
        }

        Ok(Envelope {
            version,
            body: body.clone(),
        })
    }

    /// Check a complete request message.
    pub fn validate_request(&self, text: &str) -> Checked<Request> {
        let envelope = self.validate_envelope(text)?;
        request_from_body(&envelope.body)
    }

    /// Check a reply against the text of the request it should answer.
    ///
    /// An invalid original request fails with its own code, the message
    /// prefixed by `original request:`.
    pub fn validate_reply(&self, original_request: &str, reply_text: &str) -> Checked<Reply> {
        let request = self.validate_request(original_request).map_err(|err| {
            ValidationError::new(err.code, format!("original request: {}", err.message))
        })?;
        self.validate_reply_to(&request, reply_text)
    }

    /// Check a reply against an already parsed request.
    pub fn validate_reply_to(&self, request: &Request, reply_text: &str) -> Checked<Reply> {
        let envelope = self.validate_envelope(reply_text)?;
        let reply = reply_from_body(&envelope.body)?;

        if reply.id != request.id {
            return Err(body_content(format!(
                "reply id {} does not match request id {}",
                reply.id, request.id
            )));
        }
        if reply.command != request.command {
            return Err(body_content(format!(
                "reply command '{}' does not match request command '{}'",
                reply.command, request.command
            )));
        }

        Ok(reply)
    }

    /// Check a message of either kind.
    pub fn validate_message(&self, text: &str) -> Checked<Message> {
        let envelope = self.validate_envelope(text)?;
        match envelope.kind() {
            Some(BodyKind::Request) => request_from_body(&envelope.body).map(Message::Request),
            Some(BodyKind::Reply) => reply_from_body(&envelope.body).map(Message::Reply),
            None => Err(envelope_content(format!(
                "unrecognised body element <{}>",
                envelope.body.name()
            ))),
        }
    }

    fn check_version(&self, version: Option<&str>) -> Checked<()> {
        let Some(version) = version else {
            if self.config.require_version {
                return Err(envelope_content("envelope has no version"));
            }
            return Ok(());
        };

        let (major, _) = parse_version(version)?;
        let (local_major, _) = parse_version(&self.config.protocol_version)?;
        if major != local_major {
            return Err(envelope_content(format!(
                "incompatible protocol version {version}, local version is {}",
                self.config.protocol_version
            )));
        }
        Ok(())
    }
}

/// [`Validator::validate_envelope`] with the default configuration.
pub fn validate_envelope(text: &str) -> Checked<Envelope> {
    Validator::new().validate_envelope(text)
}

/// [`Validator::validate_request`] with the default configuration.
pub fn validate_request(text: &str) -> Checked<Request> {
    Validator::new().validate_request(text)
}

/// [`Validator::validate_reply`] with the default configuration.
pub fn validate_reply(original_request: &str, reply_text: &str) -> Checked<Reply> {
    Validator::new().validate_reply(original_request, reply_text)
}

pub(crate) fn request_from_body(body: &Element) -> Checked<Request> {
    expect_kind(body, BodyKind::Request)?;
    let command = command_of(body)?;
    let id = id_of(body)?;

    let timeout = body
        .attribute(ATTR_TIMEOUT)
        .ok_or_else(|| body_content("request has no timeout"))?;
    let digits = !timeout.is_empty() && timeout.bytes().all(|b| b.is_ascii_digit());
    let timeout_secs = match timeout.parse::<u32>() {
        Ok(0) if digits => return Err(body_content("timeout must be positive")),
        Ok(secs) if digits => secs,
        _ => return Err(body_content(format!("invalid timeout '{timeout}'"))),
    };

    Ok(Request {
        id,
        command,
        timeout_secs,
        body: body.children().to_vec(),
    })
}

pub(crate) fn reply_from_body(body: &Element) -> Checked<Reply> {
    expect_kind(body, BodyKind::Reply)?;
    let command = command_of(body)?;
    let id = id_of(body)?;

    let token = body
        .attribute(ATTR_RETURN_CODE)
        .ok_or_else(|| body_content("reply has no return_code"))?;
    let return_code = token
        .parse::<CommandRc>()
        .map_err(|_| body_content(format!("unknown return_code '{token}'")))?;

    Ok(Reply {
        id,
        command,
        return_code,
        reason: body.attribute(ATTR_REASON).unwrap_or_default().to_string(),
        body: body.children().to_vec(),
    })
}

fn expect_kind(body: &Element, kind: BodyKind) -> Checked<()> {
    if body.name() != kind.tag() {
        return Err(body_content(format!(
            "expected <{kind}> body, found <{}>",
            body.name()
        )));
    }
    Ok(())
}

fn command_of(body: &Element) -> Checked<String> {
    match body.attribute(ATTR_COMMAND) {
        Some(command) if !command.trim().is_empty() => Ok(command.to_string()),
        Some(_) => Err(ValidationError::new(
            ValidateRc::BodyCommand,
            "command is empty",
        )),
        None => Err(ValidationError::new(
            ValidateRc::BodyCommand,
            format!("<{}> has no command", body.name()),
        )),
    }
}

fn id_of(body: &Element) -> Checked<RequestId> {
    let raw = body
        .attribute(ATTR_ID)
        .ok_or_else(|| body_content(format!("<{}> has no id", body.name())))?;
    RequestId::parse(raw).ok_or_else(|| body_content(format!("invalid id '{raw}'")))
}

fn parse_version(version: &str) -> Checked<(u16, u16)> {
    let invalid = |detail: &str| envelope_content(format!("invalid version '{version}': {detail}"));

    let mut parts = version.split('.');
    let major = parts.next().ok_or_else(|| invalid("missing major"))?;
    let minor = parts.next().ok_or_else(|| invalid("missing minor"))?;
    if parts.next().is_some() {
        return Err(invalid("expected '<major>.<minor>'"));
    }

    let major = major
        .parse::<u16>()
        .map_err(|_| invalid("non-numeric major"))?;
    let minor = minor
        .parse::<u16>()
        .map_err(|_| invalid("non-numeric minor"))?;
    Ok((major, minor))
}

fn xml_failure(err: XmlError) -> ValidationError {
    let code = match err.depth() {
        Some(depth) if depth >= 2 => ValidateRc::BodyXml,
        _ => ValidateRc::EnvelopeXml,
    };
    ValidationError::new(code, err.to_string())
}

fn envelope_content(message: impl Into<String>) -> ValidationError {
    ValidationError::new(ValidateRc::EnvelopeContent, message)
}

fn body_content(message: impl Into<String>) -> ValidationError {
    ValidationError::new(ValidateRc::BodyContent, message)
}
