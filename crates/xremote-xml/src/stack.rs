use crate::element::{Element, MAX_DEPTH};
use crate::error::{Result, XmlError};

/// One marker in a flat XML token stack.
///
/// Attributes belong to the most recent [`XmlToken::Start`] and must follow
/// it directly (other attributes may sit in between).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlToken {
    Start(String),
    Attribute { name: String, value: String },
    Text(String),
    End(String),
}

/// An ordered, caller-assembled token stack.
///
/// Nothing is checked while pushing; balance and naming are verified by
/// [`XmlStack::to_elements`] and [`stack_to_xml`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlStack {
    tokens: Vec<XmlToken>,
}

impl XmlStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack holding the tokens of the given elements, in order.
    pub fn from_elements(elements: &[Element]) -> Self {
        let mut tokens = Vec::new();
        for element in elements {
            element.push_tokens(&mut tokens);
        }
        Self { tokens }
    }

    pub fn start_element(mut self, name: impl Into<String>) -> Self {
        self.push(XmlToken::Start(name.into()));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(XmlToken::Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.push(XmlToken::Text(text.into()));
        self
    }

    pub fn end_element(mut self, name: impl Into<String>) -> Self {
        self.push(XmlToken::End(name.into()));
        self
    }

    pub fn push(&mut self, token: XmlToken) {
        self.tokens.push(token);
    }

    pub fn extend(&mut self, tokens: impl IntoIterator<Item = XmlToken>) {
        self.tokens.extend(tokens);
    }

    pub fn tokens(&self) -> &[XmlToken] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<XmlToken> {
        self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check the stack and assemble its top-level elements.
    pub fn to_elements(&self) -> Result<Vec<Element>> {
        build_elements(&self.tokens)
    }

    /// Check the stack and serialize it.
    pub fn to_xml(&self) -> Result<String> {
        stack_to_xml(&self.tokens)
    }
}

impl From<Vec<XmlToken>> for XmlStack {
    fn from(tokens: Vec<XmlToken>) -> Self {
        Self { tokens }
    }
}

/// Assemble a token stack into its top-level elements.
///
/// Fails on unmatched start/end markers, empty names, attributes that do not
/// follow a start marker, text outside any element and nesting deeper than
/// [`MAX_DEPTH`].
pub fn build_elements(tokens: &[XmlToken]) -> Result<Vec<Element>> {
    let mut roots = Vec::new();
    let mut open: Vec<Element> = Vec::new();
    let mut in_start_tag = false;

    for token in tokens {
        match token {
            XmlToken::Start(name) => {
                ensure_name("element", name)?;
                if open.len() >= MAX_DEPTH {
                    return Err(XmlError::TooDeep(MAX_DEPTH));
                }
                open.push(Element::new(name.as_str()));
                in_start_tag = true;
            }
            XmlToken::Attribute { name, value } => {
                ensure_name("attribute", name)?;
                let element = match open.last_mut() {
                    Some(element) if in_start_tag => element,
                    _ => return Err(XmlError::MisplacedAttribute(name.clone())),
                };
                if element.attribute(name).is_some() {
                    return Err(XmlError::DuplicateAttribute(name.clone()));
                }
                element.set_attribute(name.as_str(), value.as_str());
            }
            XmlToken::Text(text) => {
                let parent = open.last_mut().ok_or(XmlError::MisplacedText)?;
                parent.push_text(text.as_str());
                in_start_tag = false;
            }
            XmlToken::End(name) => {
                ensure_name("element", name)?;
                let element = open.pop().ok_or_else(|| {
                    XmlError::Unbalanced(format!("</{name}> has no matching start"))
                })?;
                if element.name() != name {
                    return Err(XmlError::Unbalanced(format!(
                        "</{name}> closes <{}>",
                        element.name()
                    )));
                }
                in_start_tag = false;
                match open.last_mut() {
                    Some(parent) => parent.push_child(element),
                    None => roots.push(element),
                }
            }
        }
    }

    if let Some(element) = open.last() {
        return Err(XmlError::Unbalanced(format!(
            "<{}> is never closed",
            element.name()
        )));
    }

    Ok(roots)
}

/// Serialize a token stack to XML text.
pub fn stack_to_xml(tokens: &[XmlToken]) -> Result<String> {
    let mut out = String::new();
    for element in build_elements(tokens)? {
        out.push_str(&element.to_xml()?);
    }
    Ok(out)
}

/// Splice `body` under a `<tag_name>` wrapper at the end of `stack`.
///
/// The stack may still have open elements; the wrapper nests inside the
/// innermost one.
pub fn add_body(mut stack: XmlStack, tag_name: &str, body: &XmlStack) -> Result<XmlStack> {
    ensure_name("element", tag_name)?;
    stack.push(XmlToken::Start(tag_name.to_string()));
    stack.extend(body.tokens().iter().cloned());
    stack.push(XmlToken::End(tag_name.to_string()));
    Ok(stack)
}

fn ensure_name(kind: &'static str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(XmlError::EmptyName(kind));
    }
    Ok(())
}
