use std::fmt;
use std::time::Duration;

use xremote_xml::{Element, Node, XmlStack};

use crate::codes::CommandRc;
use crate::id::RequestId;

pub const ENVELOPE_TAG: &str = "envelope";
pub const REQUEST_TAG: &str = "request";
pub const REPLY_TAG: &str = "reply";

pub const ATTR_VERSION: &str = "version";
pub const ATTR_ID: &str = "id";
pub const ATTR_COMMAND: &str = "command";
pub const ATTR_TIMEOUT: &str = "timeout";
pub const ATTR_RETURN_CODE: &str = "return_code";
pub const ATTR_REASON: &str = "reason";

/// The two body elements an envelope may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Request,
    Reply,
}

impl BodyKind {
    pub fn tag(self) -> &'static str {
        match self {
            BodyKind::Request => REQUEST_TAG,
            BodyKind::Reply => REPLY_TAG,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            REQUEST_TAG => Some(BodyKind::Request),
            REPLY_TAG => Some(BodyKind::Reply),
            _ => None,
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A validated `request` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub command: String,
    pub timeout_secs: u32,
    /// Application content nested in the body, kept verbatim.
    pub body: Vec<Node>,
}

impl Request {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_secs))
    }

    pub fn to_element(&self) -> Element {
        let mut element = Element::new(REQUEST_TAG)
            .with_attribute(ATTR_ID, self.id.to_string())
            .with_attribute(ATTR_COMMAND, self.command.as_str())
            .with_attribute(ATTR_TIMEOUT, self.timeout_secs.to_string());
        push_body(&mut element, &self.body);
        element
    }

    /// Body content as a token stack.
    pub fn body_stack(&self) -> XmlStack {
        nodes_to_stack(&self.body)
    }
}

/// A validated `reply` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: RequestId,
    pub command: String,
    pub return_code: CommandRc,
    /// Empty when the reply carried no `reason`.
    pub reason: String,
    pub body: Vec<Node>,
}

impl Reply {
    /// True when the command itself succeeded.
    pub fn is_ok(&self) -> bool {
        self.return_code.is_ok()
    }

    /// True when `id` and `command` both match `request`.
    pub fn answers(&self, request: &Request) -> bool {
        self.id == request.id && self.command == request.command
    }

    pub fn to_element(&self) -> Element {
        let mut element = Element::new(REPLY_TAG)
            .with_attribute(ATTR_ID, self.id.to_string())
            .with_attribute(ATTR_COMMAND, self.command.as_str())
            .with_attribute(ATTR_RETURN_CODE, self.return_code.as_str())
            .with_attribute(ATTR_REASON, self.reason.as_str());
        push_body(&mut element, &self.body);
        element
    }

    pub fn body_stack(&self) -> XmlStack {
        nodes_to_stack(&self.body)
    }
}

/// Either kind of validated body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Reply(Reply),
}

impl Message {
    pub fn kind(&self) -> BodyKind {
        match self {
            Message::Request(_) => BodyKind::Request,
            Message::Reply(_) => BodyKind::Reply,
        }
    }

    pub fn id(&self) -> RequestId {
        match self {
            Message::Request(request) => request.id,
            Message::Reply(reply) => reply.id,
        }
    }

    pub fn command(&self) -> &str {
        match self {
            Message::Request(request) => &request.command,
            Message::Reply(reply) => &reply.command,
        }
    }
}

/// An envelope that passed structural checks; the body is not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: Option<String>,
    pub body: Element,
}

impl Envelope {
    pub fn new(version: impl Into<String>, body: Element) -> Self {
        Self {
            version: Some(version.into()),
            body,
        }
    }

    pub fn kind(&self) -> Option<BodyKind> {
        BodyKind::from_tag(self.body.name())
    }

    pub fn to_element(&self) -> Element {
        let mut element = Element::new(ENVELOPE_TAG);
        if let Some(version) = &self.version {
            element.set_attribute(ATTR_VERSION, version.as_str());
        }
        element.with_child(self.body.clone())
    }

    pub fn to_xml(&self) -> xremote_xml::Result<String> {
        self.to_element().to_xml()
    }
}

fn push_body(element: &mut Element, body: &[Node]) {
    for node in body {
        element.push_node(node.clone());
    }
}

fn nodes_to_stack(nodes: &[Node]) -> XmlStack {
    let mut stack = XmlStack::new();
    for node in nodes {
        match node {
            Node::Element(element) => stack.extend(element.to_tokens()),
            Node::Text(text) => stack.push(xremote_xml::XmlToken::Text(text.clone())),
        }
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping(id: u64) -> Request {
        Request {
            id: RequestId::new(id).unwrap(),
            command: "ping".to_string(),
            timeout_secs: 5,
            body: Vec::new(),
        }
    }

    #[test]
    fn request_element_carries_attributes() {
        let xml = ping(3).to_element().to_xml().unwrap();
        assert_eq!(xml, r#"<request id="3" command="ping" timeout="5"/>"#);
    }

    #[test]
    fn envelope_wraps_body_with_version() {
        let envelope = Envelope::new("1.0", ping(1).to_element());
        assert_eq!(envelope.kind(), Some(BodyKind::Request));
        assert_eq!(
            envelope.to_xml().unwrap(),
            r#"<envelope version="1.0"><request id="1" command="ping" timeout="5"/></envelope>"#
        );
    }

    #[test]
    fn reply_answers_matching_request_only() {
        let request = ping(7);
        let mut reply = Reply {
            id: request.id,
            command: "ping".to_string(),
            return_code: CommandRc::Ok,
            reason: String::new(),
            body: Vec::new(),
        };
        assert!(reply.answers(&request));
        assert!(reply.is_ok());

        reply.id = RequestId::new(8).unwrap();
        assert!(!reply.answers(&request));
    }

    #[test]
    fn body_is_kept_verbatim() {
        let mut request = ping(2);
        request.body = vec![
            Node::Element(Element::new("feature").with_attribute("name", "exon")),
            Node::Text("note".to_string()),
        ];
        let element = request.to_element();
        assert_eq!(element.children(), request.body.as_slice());
        assert_eq!(request.body_stack().len(), 4);
        assert_eq!(request.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn body_kind_tags() {
        assert_eq!(BodyKind::from_tag("reply"), Some(BodyKind::Reply));
        assert_eq!(BodyKind::from_tag("Request"), None);
        assert_eq!(BodyKind::Request.to_string(), "request");
    }
}
