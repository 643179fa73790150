//! XML remote command protocol.
//!
//! Lets an external process drive a viewer over a textual channel: requests
//! and replies travel as `envelope` documents, are validated on arrival and
//! are correlated one command at a time.
//!
//! # Crate Structure
//!
//! - [`xml`]: Element trees and token stacks over `quick-xml`
//! - [`frame`]: Length-prefixed framing of documents over byte streams
//! - [`protocol`]: Return codes, builders, codec and validator
//! - [`peer`]: Correlator, channels, transports and responder (behind `peer` feature)

/// Re-export XML types.
pub mod xml {
    pub use xremote_xml::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xremote_frame::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use xremote_protocol::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use xremote_peer::*;
}
