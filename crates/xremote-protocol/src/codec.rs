use xremote_xml::{Element, Node, XmlStack};

use crate::codes::CommandRc;
use crate::config::ProtocolConfig;
use crate::error::{ProtocolError, Result};
use crate::id::{IdGenerator, RequestId};
use crate::message::{
    BodyKind, Envelope, Reply, Request, ATTR_COMMAND, ATTR_ID, ENVELOPE_TAG,
};
use crate::validator::Validator;

/// A request ready to send: the structured form and its wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub request: Request,
    pub xml: String,
}

impl OutgoingRequest {
    pub fn id(&self) -> RequestId {
        self.request.id
    }
}

/// Builds `request` envelopes.
///
/// ```
/// use xremote_protocol::{IdGenerator, RequestBuilder};
/// use xremote_xml::XmlStack;
///
/// let ids = IdGenerator::new();
/// let body = XmlStack::new()
///     .start_element("align")
///     .attribute("start", "100")
///     .end_element("align");
/// let outgoing = RequestBuilder::new("zoom_to")
///     .timeout_secs(10)
///     .body(body)
///     .build(&ids)
///     .unwrap();
///
/// assert_eq!(outgoing.request.id.get(), 1);
/// assert!(outgoing.xml.contains(r#"command="zoom_to""#));
/// ```
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    config: ProtocolConfig,
    command: String,
    timeout_secs: u32,
    body: XmlStack,
}

impl RequestBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self::with_config(command, ProtocolConfig::default())
    }

    pub fn with_config(command: impl Into<String>, config: ProtocolConfig) -> Self {
        Self {
            timeout_secs: config.default_timeout_secs,
            command: command.into(),
            body: XmlStack::new(),
            config,
        }
    }

    pub fn timeout_secs(mut self, secs: u32) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn body(mut self, body: XmlStack) -> Self {
        self.body = body;
        self
    }

    /// Check the inputs, then draw a fresh id from `ids`.
    ///
    /// No id is consumed when the inputs are rejected.
    pub fn build(self, ids: &IdGenerator) -> Result<OutgoingRequest> {
        let body = self.checked_body()?;
        self.assemble(ids.next_id(), body)
    }

    /// Build with a caller-chosen id.
    pub fn build_with_id(self, id: RequestId) -> Result<OutgoingRequest> {
        let body = self.checked_body()?;
        self.assemble(id, body)
    }

    fn checked_body(&self) -> Result<Vec<Node>> {
        if self.command.trim().is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }
        if self.timeout_secs == 0 {
            return Err(ProtocolError::InvalidTimeout);
        }
        stack_nodes(&self.body)
    }

    fn assemble(self, id: RequestId, body: Vec<Node>) -> Result<OutgoingRequest> {
        let request = Request {
            id,
            command: self.command,
            timeout_secs: self.timeout_secs,
            body,
        };
        let xml = Envelope::new(self.config.protocol_version, request.to_element()).to_xml()?;
        Ok(OutgoingRequest { request, xml })
    }
}

/// Builds `reply` envelopes answering a known request.
#[derive(Debug, Clone)]
pub struct ReplyBuilder {
    id: RequestId,
    command: String,
    return_code: CommandRc,
    reason: String,
    body: XmlStack,
    version: String,
}

impl ReplyBuilder {
    /// Reply to `request`, copying its id and command. Defaults to `ok` with no reason.
    pub fn for_request(request: &Request) -> Self {
        Self::new(request.id, request.command.clone())
    }

    /// Reply to a request known only by id and command.
    pub fn new(id: RequestId, command: impl Into<String>) -> Self {
        Self {
            id,
            command: command.into(),
            return_code: CommandRc::Ok,
            reason: String::new(),
            body: XmlStack::new(),
            version: ProtocolConfig::default().protocol_version,
        }
    }

    pub fn return_code(mut self, code: CommandRc) -> Self {
        self.return_code = code;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn body(mut self, body: XmlStack) -> Self {
        self.body = body;
        self
    }

    /// Envelope version to emit.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build_reply(&self) -> Result<Reply> {
        Ok(Reply {
            id: self.id,
            command: self.command.clone(),
            return_code: self.return_code,
            reason: self.reason.clone(),
            body: stack_nodes(&self.body)?,
        })
    }

    /// Serialize the reply envelope.
    pub fn build(self) -> Result<String> {
        let reply = self.build_reply()?;
        Ok(Envelope::new(self.version, reply.to_element()).to_xml()?)
    }
}

/// Build a request with a fresh id, the given command, timeout and body.
pub fn create_request(
    ids: &IdGenerator,
    command: &str,
    timeout_secs: u32,
    body: &XmlStack,
) -> Result<OutgoingRequest> {
    RequestBuilder::new(command)
        .timeout_secs(timeout_secs)
        .body(body.clone())
        .build(ids)
}

/// Build the reply to `original_request`, copying its id and command.
///
/// Fails with [`ProtocolError::InvalidRequest`] when the original does not
/// validate as a request.
pub fn create_reply_from_request(
    original_request: &str,
    return_code: CommandRc,
    reason: &str,
    body: &XmlStack,
) -> Result<String> {
    let request = Validator::new().validate_request(original_request)?;
    ReplyBuilder::for_request(&request)
        .return_code(return_code)
        .reason(reason)
        .body(body.clone())
        .build()
}

/// Recover `id` and `command` from a request that may not validate.
///
/// Looks at a bare `request` root or the first `request` inside an
/// `envelope`. Returns `None` when the text does not parse or either value
/// is unusable.
pub fn peek_identity(text: &str) -> Option<(RequestId, String)> {
    let root = Element::parse(text).ok()?;
    let request = if root.name() == ENVELOPE_TAG {
        root.child_elements()
            .find(|child| child.name() == BodyKind::Request.tag())?
    } else if root.name() == BodyKind::Request.tag() {
        &root
    } else {
        return None;
    };

    let id = RequestId::parse(request.attribute(ATTR_ID)?)?;
    let command = request.attribute(ATTR_COMMAND)?;
    if command.trim().is_empty() {
        return None;
    }
    Some((id, command.to_string()))
}

fn stack_nodes(stack: &XmlStack) -> Result<Vec<Node>> {
    Ok(stack
        .to_elements()?
        .into_iter()
        .map(Node::Element)
        .collect())
}
