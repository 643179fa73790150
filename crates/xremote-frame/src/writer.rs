use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Frames XML documents onto a byte stream.
///
/// Each call writes one whole frame and flushes. `Interrupted` and
/// `WouldBlock` are retried, so a send never leaves half a frame behind.
pub struct FrameWriter<T> {
    stream: T,
    scratch: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(stream: T) -> Self {
        Self::with_config(stream, FrameConfig::default())
    }

    pub fn with_config(stream: T, config: FrameConfig) -> Self {
        Self {
            stream,
            scratch: BytesMut::new(),
            config,
        }
    }

    /// Frame and send one document.
    pub fn send(&mut self, document: &str) -> Result<()> {
        self.put(document.as_bytes())
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.put(&frame.payload)
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    fn put(&mut self, payload: &[u8]) -> Result<()> {
        let max = self.config.max_payload_size;
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }

        self.scratch.clear();
        encode_frame(payload, &mut self.scratch)?;

        let mut rest = &self.scratch[..];
        while !rest.is_empty() {
            let written = retry(|| self.stream.write(rest))?;
            if written == 0 {
                return Err(FrameError::ConnectionClosed);
            }
            rest = &rest[written..];
        }
        retry(|| self.stream.flush())?;

        tracing::trace!(size = payload.len(), "document sent");
        Ok(())
    }
}

#[cfg(unix)]
impl FrameWriter<std::os::unix::net::UnixStream> {
    /// Wrap a Unix socket, applying `config.write_timeout` to it.
    pub fn with_config_unix(
        stream: std::os::unix::net::UnixStream,
        config: FrameConfig,
    ) -> Result<Self> {
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(stream, config))
    }
}

fn retry<R>(mut op: impl FnMut() -> io::Result<R>) -> Result<R> {
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {}
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}
