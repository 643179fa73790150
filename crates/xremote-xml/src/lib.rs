//! XML element model for the xremote protocol.
//!
//! Two ways to build XML:
//! - [`Element`] trees, parsed from text or assembled directly
//! - [`XmlStack`] token lists (start/attribute/text/end markers) that are
//!   checked for balance before being turned into elements or text
//!
//! Parsing and escaping are delegated to `quick-xml`.

pub mod element;
pub mod error;
pub mod stack;

pub use element::{Element, Node, MAX_DEPTH};
pub use error::{Result, XmlError};
pub use stack::{add_body, build_elements, stack_to_xml, XmlStack, XmlToken};
