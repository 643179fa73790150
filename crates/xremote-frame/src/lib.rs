//! Length-prefixed framing of XML documents over byte streams.
//!
//! Every document travels as one frame:
//! - A 2-byte magic number ("XR") for stream synchronization
//! - A 4-byte little-endian payload length
//! - The UTF-8 encoded document
//!
//! Readers hand back complete documents; partial reads stay internal.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
