use std::time::{Duration, Instant};

use xremote_protocol::{IdGenerator, ProtocolConfig, Reply, RequestBuilder, RequestId, Validator};
use xremote_xml::XmlStack;

use crate::correlator::{CommandState, Correlator, Outstanding};
use crate::error::{PeerError, Result};
use crate::transport::Transport;

/// Default wait between receive attempts while a reply is outstanding.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Channel behavior configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub protocol: ProtocolConfig,
    /// Upper bound on a single transport receive.
    pub poll_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The requesting side of one connection.
///
/// Sends one request at a time and waits for its reply.
pub struct Channel<T> {
    transport: T,
    correlator: Correlator,
    ids: IdGenerator,
    config: ChannelConfig,
}

impl<T: Transport> Channel<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ChannelConfig::default())
    }

    pub fn with_config(transport: T, config: ChannelConfig) -> Self {
        Self {
            transport,
            correlator: Correlator::with_validator(Validator::with_config(config.protocol.clone())),
            ids: IdGenerator::new(),
            config,
        }
    }

    /// Build and send a request, leaving it outstanding.
    ///
    /// Fails with [`PeerError::CommandOutstanding`] while a previous request
    /// has not finished; nothing is sent in that case.
    pub fn send_request(
        &mut self,
        command: &str,
        timeout_secs: u32,
        body: &XmlStack,
    ) -> Result<RequestId> {
        if let Some(outstanding) = self.pending() {
            return Err(PeerError::CommandOutstanding {
                id: outstanding.id(),
                command: outstanding.command().to_string(),
            });
        }

        let outgoing = RequestBuilder::with_config(command, self.config.protocol.clone())
            .timeout_secs(timeout_secs)
            .body(body.clone())
            .build(&self.ids)?;

        if let Some(unclaimed) = self.correlator.begin(&outgoing.request)? {
            tracing::warn!(id = %unclaimed.id(), "earlier request was never awaited");
        }
        if let Err(err) = self.transport.send(&outgoing.xml) {
            self.correlator.abandon();
            self.correlator.take_outcome();
            return Err(err);
        }

        tracing::debug!(id = %outgoing.request.id, command, "request sent");
        Ok(outgoing.request.id)
    }

    /// Receive until the outstanding request completes.
    ///
    /// A reply that does not answer the request is returned as
    /// [`PeerError::ReplyRejected`]; the request stays outstanding and the
    /// caller may call this again or [`Channel::abandon`].
    pub fn await_reply(&mut self) -> Result<Reply> {
        loop {
            let now = Instant::now();
            self.correlator.expire_overdue_at(now);
            if let Some(outcome) = self.correlator.take_outcome() {
                return outcome.into_result();
            }

            let deadline = self.correlator.deadline().ok_or(PeerError::NotOutstanding)?;
            let wait = deadline
                .saturating_duration_since(now)
                .min(self.config.poll_interval);

            let Some(text) = self.transport.recv(wait)? else {
                continue;
            };
            match self.correlator.deliver_reply(&text) {
                Ok(_) => {}
                // The command expired between the check above and delivery.
                Err(PeerError::UnsolicitedReply(_)) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Send a request and wait for its reply.
    pub fn request(&mut self, command: &str, timeout_secs: u32, body: &XmlStack) -> Result<Reply> {
        self.send_request(command, timeout_secs, body)?;
        self.await_reply()
    }

    /// Drop the outstanding request, if any.
    pub fn abandon(&mut self) -> Option<Outstanding> {
        let dropped = self.correlator.abandon();
        self.correlator.take_outcome();
        dropped
    }

    /// Name of the outstanding command, if any.
    pub fn current_command(&self) -> Option<String> {
        self.correlator.current_command()
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn pending(&self) -> Option<Outstanding> {
        self.correlator.expire_overdue();
        match self.correlator.state() {
            CommandState::AwaitingReply(outstanding) => Some(outstanding),
            CommandState::Idle => None,
        }
    }
}
