use std::fmt::Display;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{Result, XmlError};
use crate::stack::XmlToken;

/// Deepest element nesting accepted from parsed text or token stacks.
pub const MAX_DEPTH: usize = 256;

/// A child of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data (already unescaped).
    Text(String),
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style [`Element::push_child`].
    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    /// Set an attribute, replacing any previous value under the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn push_node(&mut self, node: Node) {
        self.children.push(node);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute value by exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// True when any direct text child has non-whitespace content.
    pub fn has_text(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, Node::Text(text) if !text.trim().is_empty()))
    }

    /// Parse a document with exactly one root element.
    pub fn parse(text: &str) -> Result<Element> {
        let mut roots = parse_elements(text)?;
        match roots.len() {
            0 => Err(XmlError::Parse {
                depth: 0,
                message: "document has no root element".to_string(),
            }),
            1 => Ok(roots.remove(0)),
            n => Err(XmlError::Parse {
                depth: 0,
                message: format!("document has {n} root elements"),
            }),
        }
    }

    /// Parse a fragment that may hold any number of top-level elements.
    pub fn parse_fragment(text: &str) -> Result<Vec<Element>> {
        parse_elements(text)
    }

    /// Serialize this element (compact, no declaration).
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|err| XmlError::Write(err.to_string()))
    }

    /// Flatten this element back into stack tokens.
    pub fn to_tokens(&self) -> Vec<XmlToken> {
        let mut tokens = Vec::new();
        self.push_tokens(&mut tokens);
        tokens
    }

    pub(crate) fn push_tokens(&self, out: &mut Vec<XmlToken>) {
        out.push(XmlToken::Start(self.name.clone()));
        for (name, value) in &self.attributes {
            out.push(XmlToken::Attribute {
                name: name.clone(),
                value: value.clone(),
            });
        }
        for child in &self.children {
            match child {
                Node::Element(element) => element.push_tokens(out),
                Node::Text(text) => out.push(XmlToken::Text(text.clone())),
            }
        }
        out.push(XmlToken::End(self.name.clone()));
    }

    pub(crate) fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            }
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| XmlError::Write(err.to_string()))
}

fn parse_elements(text: &str) -> Result<Vec<Element>> {
    let mut reader = Reader::from_str(text);

    let mut roots = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| parse_error(open.len(), err))?;

        match event {
            Event::Start(start) => {
                ensure_depth(open.len())?;
                let element = start_element(&start, open.len())?;
                open.push(element);
            }
            Event::Empty(start) => {
                ensure_depth(open.len())?;
                let element = start_element(&start, open.len())?;
                attach(&mut open, &mut roots, element);
            }
            Event::End(end) => {
                let depth = open.len();
                let name = decode_name(end.name().as_ref(), depth)?;
                let element = open
                    .pop()
                    .ok_or_else(|| parse_error(depth, format!("unexpected </{name}>")))?;
                if element.name != name {
                    return Err(parse_error(
                        depth,
                        format!("</{name}> does not close <{}>", element.name),
                    ));
                }
                attach(&mut open, &mut roots, element);
            }
            Event::Text(content) => {
                let value = content
                    .unescape()
                    .map_err(|err| parse_error(open.len(), err))?;
                push_text(&mut open, value.into_owned())?;
            }
            Event::CData(content) => {
                let value = String::from_utf8(content.into_inner().into_owned())
                    .map_err(|err| parse_error(open.len(), err))?;
                push_text(&mut open, value)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no content.
            _ => {}
        }
    }

    if let Some(element) = open.last() {
        return Err(parse_error(
            open.len(),
            format!("unexpected end of input inside <{}>", element.name),
        ));
    }

    Ok(roots)
}

fn ensure_depth(depth: usize) -> Result<()> {
    if depth >= MAX_DEPTH {
        return Err(parse_error(
            depth,
            format!("elements nested deeper than {MAX_DEPTH}"),
        ));
    }
    Ok(())
}

fn start_element(start: &BytesStart<'_>, depth: usize) -> Result<Element> {
    let name = decode_name(start.name().as_ref(), depth)?;
    let mut element = Element::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| parse_error(depth, err))?;
        let key = decode_name(attribute.key.as_ref(), depth)?;
        if element.attribute(&key).is_some() {
            return Err(parse_error(depth, format!("duplicate attribute '{key}'")));
        }
        let value = attribute
            .unescape_value()
            .map_err(|err| parse_error(depth, err))?;
        element.attributes.push((key, value.into_owned()));
    }

    Ok(element)
}

fn attach(open: &mut [Element], roots: &mut Vec<Element>, element: Element) {
    match open.last_mut() {
        Some(parent) => parent.push_child(element),
        None => roots.push(element),
    }
}

fn push_text(open: &mut [Element], value: String) -> Result<()> {
    match open.last_mut() {
        Some(parent) => {
            parent.push_text(value);
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(parse_error(0, "text outside of the root element")),
    }
}

fn decode_name(raw: &[u8], depth: usize) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|err| parse_error(depth, err))
}

fn parse_error(depth: usize, err: impl Display) -> XmlError {
    XmlError::Parse {
        depth,
        message: err.to_string(),
    }
}
