use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use xremote_frame::{FrameReader, FrameWriter};

use crate::error::{PeerError, Result};

/// Moves whole XML documents between peers.
pub trait Transport {
    /// Send one document.
    fn send(&mut self, message: &str) -> Result<()>;

    /// Receive one document, or `None` if nothing arrived within `timeout`.
    ///
    /// Implementations may return early with `None`; callers loop.
    fn recv(&mut self, timeout: Duration) -> Result<Option<String>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, message: &str) -> Result<()> {
        (**self).send(message)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<String>> {
        (**self).recv(timeout)
    }
}

/// Framed documents over a byte stream.
///
/// A read timeout on the underlying stream surfaces as "nothing received";
/// the `timeout` passed to [`Transport::recv`] is not applied to the stream,
/// so streams without a read timeout block until a frame arrives.
pub struct StreamTransport<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

impl<R: Read, W: Write> StreamTransport<R, W> {
    pub fn new(reader: FrameReader<R>, writer: FrameWriter<W>) -> Self {
        Self { reader, writer }
    }

    pub fn reader_mut(&mut self) -> &mut FrameReader<R> {
        &mut self.reader
    }

    pub fn writer_mut(&mut self) -> &mut FrameWriter<W> {
        &mut self.writer
    }

    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}

#[cfg(unix)]
impl StreamTransport<std::os::unix::net::UnixStream, std::os::unix::net::UnixStream> {
    /// Wrap a connected Unix socket; reads give up after `poll_interval`.
    pub fn unix(
        stream: std::os::unix::net::UnixStream,
        mut config: xremote_frame::FrameConfig,
        poll_interval: Duration,
    ) -> Result<Self> {
        let reader_stream = stream.try_clone().map_err(xremote_frame::FrameError::Io)?;
        config.read_timeout = Some(poll_interval);
        let reader = FrameReader::with_config_unix(reader_stream, config.clone())?;
        let writer = FrameWriter::with_config_unix(stream, config)?;
        Ok(Self::new(reader, writer))
    }
}

impl<R: Read, W: Write> Transport for StreamTransport<R, W> {
    fn send(&mut self, message: &str) -> Result<()> {
        self.writer.send(message)?;
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Option<String>> {
        match self.reader.read_text() {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.is_timeout() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process transport over a pair of channels.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl MemoryTransport {
    /// Two connected ends.
    pub fn pair() -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::channel();
        let (right_tx, left_rx) = mpsc::channel();
        (
            Self {
                tx: left_tx,
                rx: left_rx,
            },
            Self {
                tx: right_tx,
                rx: right_rx,
            },
        )
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, message: &str) -> Result<()> {
        self.tx
            .send(message.to_string())
            .map_err(|_| PeerError::Disconnected)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<String>> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PeerError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn memory_pair_delivers_both_ways() {
        let (mut left, mut right) = MemoryTransport::pair();
        left.send("<a/>").unwrap();
        right.send("<b/>").unwrap();

        assert_eq!(
            right.recv(Duration::from_millis(100)).unwrap().as_deref(),
            Some("<a/>")
        );
        assert_eq!(
            left.recv(Duration::from_millis(100)).unwrap().as_deref(),
            Some("<b/>")
        );
    }

    #[test]
    fn memory_recv_times_out_then_disconnects() {
        let (mut left, right) = MemoryTransport::pair();
        assert!(left.recv(Duration::from_millis(10)).unwrap().is_none());

        drop(right);
        assert!(matches!(
            left.recv(Duration::from_millis(10)),
            Err(PeerError::Disconnected)
        ));
        assert!(matches!(left.send("<a/>"), Err(PeerError::Disconnected)));
    }

    #[test]
    fn stream_transport_reads_framed_documents() {
        let mut sink = FrameWriter::new(Vec::<u8>::new());
        sink.send("<first/>").unwrap();
        sink.send("<second/>").unwrap();
        let wire = sink.into_inner();

        let mut transport = StreamTransport::new(
            FrameReader::new(Cursor::new(wire)),
            FrameWriter::new(Vec::<u8>::new()),
        );
        let wait = Duration::from_millis(10);
        assert_eq!(transport.recv(wait).unwrap().as_deref(), Some("<first/>"));
        assert_eq!(transport.recv(wait).unwrap().as_deref(), Some("<second/>"));
        assert!(matches!(transport.recv(wait), Err(PeerError::Disconnected)));
    }

    #[test]
    #[cfg(unix)]
    fn unix_transport_polls_and_roundtrips() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let poll = Duration::from_millis(20);
        let config = xremote_frame::FrameConfig::default();
        let mut client = StreamTransport::unix(left, config.clone(), poll).unwrap();
        let mut server = StreamTransport::unix(right, config, poll).unwrap();

        assert!(server.recv(poll).unwrap().is_none());

        client.send("<envelope/>").unwrap();
        assert_eq!(server.recv(poll).unwrap().as_deref(), Some("<envelope/>"));
    }
}
