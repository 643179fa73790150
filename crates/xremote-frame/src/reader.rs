use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK: usize = 8 * 1024;

/// Pulls framed XML documents off a byte stream.
///
/// Bytes received before a read timeout stay buffered, so the next call
/// resumes the same frame.
pub struct FrameReader<T> {
    stream: T,
    pending: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    pub fn new(stream: T) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    pub fn with_config(stream: T, config: FrameConfig) -> Self {
        Self {
            stream,
            pending: BytesMut::with_capacity(READ_CHUNK),
            config,
        }
    }

    /// Block until a whole frame is buffered.
    ///
    /// End of stream, including mid-frame, is `FrameError::ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.pending, self.config.max_payload_size)? {
                return Ok(frame);
            }
            self.fill()?;
        }
    }

    /// Read the next frame as document text.
    pub fn read_text(&mut self) -> Result<String> {
        let frame = self.read_frame()?;
        let text = frame.text()?.to_string();
        tracing::trace!(size = text.len(), "document received");
        Ok(text)
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    fn fill(&mut self) -> Result<()> {
        let filled = self.pending.len();
        self.pending.resize(filled + READ_CHUNK, 0);
        let result = loop {
            match self.stream.read(&mut self.pending[filled..]) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match result {
            Ok(0) => {
                self.pending.truncate(filled);
                Err(FrameError::ConnectionClosed)
            }
            Ok(read) => {
                self.pending.truncate(filled + read);
                Ok(())
            }
            Err(err) => {
                self.pending.truncate(filled);
                Err(FrameError::Io(err))
            }
        }
    }
}

#[cfg(unix)]
impl FrameReader<std::os::unix::net::UnixStream> {
    /// Wrap a Unix socket, applying `config.read_timeout` to it.
    pub fn with_config_unix(
        stream: std::os::unix::net::UnixStream,
        config: FrameConfig,
    ) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}
