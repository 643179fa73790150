/// Errors raised while parsing, building or writing XML.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    /// The text is not well-formed XML.
    ///
    /// `depth` is the number of elements that were open when parsing failed.
    #[error("malformed XML at depth {depth}: {message}")]
    Parse { depth: usize, message: String },

    /// Start and end markers in a token stack do not pair up.
    #[error("unbalanced element stack: {0}")]
    Unbalanced(String),

    /// An element or attribute was given an empty name.
    #[error("empty {0} name")]
    EmptyName(&'static str),

    /// An attribute token does not directly follow a start marker.
    #[error("attribute '{0}' is not inside a start tag")]
    MisplacedAttribute(String),

    /// The same attribute was given twice on one element.
    #[error("duplicate attribute '{0}'")]
    DuplicateAttribute(String),

    /// A text token appears outside of any element.
    #[error("text outside of any element")]
    MisplacedText,

    /// A token stack nests elements deeper than the allowed limit.
    #[error("elements nested deeper than {0}")]
    TooDeep(usize),

    /// Serialization failed.
    #[error("failed to write XML: {0}")]
    Write(String),
}

impl XmlError {
    /// Nesting depth at which parsing failed, for parse errors.
    pub fn depth(&self) -> Option<usize> {
        match self {
            XmlError::Parse { depth, .. } => Some(*depth),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, XmlError>;
