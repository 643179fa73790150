use std::time::Duration;

use xremote_protocol::{peek_identity, CommandRc, ProtocolConfig, ReplyBuilder, Request, Validator};
use xremote_xml::XmlStack;

use crate::error::{PeerError, Result};
use crate::transport::Transport;

/// Built-in liveness command, answered without consulting the handler.
pub const PING_COMMAND: &str = "ping";

/// What a handler wants to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerReply {
    pub code: CommandRc,
    pub reason: String,
    pub body: XmlStack,
}

impl HandlerReply {
    pub fn new(code: CommandRc, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            body: XmlStack::new(),
        }
    }

    pub fn ok(reason: impl Into<String>) -> Self {
        Self::new(CommandRc::Ok, reason)
    }

    pub fn with_body(mut self, body: XmlStack) -> Self {
        self.body = body;
        self
    }
}

/// Executes validated requests on behalf of a [`Responder`].
pub trait CommandHandler {
    fn handle(&mut self, request: &Request) -> HandlerReply;
}

impl<F> CommandHandler for F
where
    F: FnMut(&Request) -> HandlerReply,
{
    fn handle(&mut self, request: &Request) -> HandlerReply {
        self(request)
    }
}

/// Turns request text into reply text.
pub struct Responder<H> {
    handler: H,
    validator: Validator,
}

impl<H: CommandHandler> Responder<H> {
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, ProtocolConfig::default())
    }

    pub fn with_config(handler: H, config: ProtocolConfig) -> Self {
        Self {
            handler,
            validator: Validator::with_config(config),
        }
    }

    /// Answer one request.
    ///
    /// A request that fails validation is answered with `bad_xml` when its
    /// id and command can still be read; otherwise the validation error is
    /// returned as [`PeerError::InvalidRequest`].
    pub fn respond(&mut self, text: &str) -> Result<String> {
        let version = self.validator.config().protocol_version.clone();

        let request = match self.validator.validate_request(text) {
            Ok(request) => request,
            Err(err) => {
                let Some((id, command)) = peek_identity(text) else {
                    tracing::warn!(code = %err.code, reason = %err.message, "unanswerable request");
                    return Err(PeerError::InvalidRequest(err));
                };
                tracing::warn!(%id, %command, code = %err.code, "invalid request");
                return Ok(ReplyBuilder::new(id, command)
                    .return_code(CommandRc::BadXml)
                    .reason(err.to_string())
                    .version(version)
                    .build()?);
            }
        };

        let answer = if request.command == PING_COMMAND {
            HandlerReply::ok("pong")
        } else {
            self.handler.handle(&request)
        };
        tracing::debug!(id = %request.id, command = %request.command, code = %answer.code, "request answered");

        Ok(ReplyBuilder::for_request(&request)
            .return_code(answer.code)
            .reason(answer.reason)
            .body(answer.body)
            .version(version)
            .build()?)
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

/// Receive at most one request from `transport` and answer it.
///
/// Returns `Ok(false)` when nothing arrived within `timeout`.
pub fn serve_one<T, H>(
    transport: &mut T,
    responder: &mut Responder<H>,
    timeout: Duration,
) -> Result<bool>
where
    T: Transport + ?Sized,
    H: CommandHandler,
{
    let Some(text) = transport.recv(timeout)? else {
        return Ok(false);
    };
    let reply = responder.respond(&text)?;
    transport.send(&reply)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use xremote_protocol::{validate_reply, RequestBuilder, RequestId};

    use super::*;
    use crate::channel::{Channel, ChannelConfig};
    use crate::transport::MemoryTransport;

    fn request_text(command: &str) -> String {
        RequestBuilder::new(command)
            .timeout_secs(5)
            .build_with_id(RequestId::new(12).unwrap())
            .unwrap()
            .xml
    }

    fn unknown(_: &Request) -> HandlerReply {
        HandlerReply::new(CommandRc::CmdUnknown, "no such command")
    }

    #[test]
    fn ping_is_answered_without_handler() {
        let called = Cell::new(false);
        let mut responder = Responder::new(|_: &Request| {
            called.set(true);
            HandlerReply::new(CommandRc::Failed, "")
        });

        let original = request_text("ping");
        let reply = validate_reply(&original, &responder.respond(&original).unwrap()).unwrap();
        assert_eq!(reply.return_code, CommandRc::Ok);
        assert_eq!(reply.reason, "pong");
        assert!(!called.get());
    }

    #[test]
    fn handler_result_becomes_reply() {
        let mut responder = Responder::new(|request: &Request| {
            HandlerReply::ok(format!("zoomed {}", request.id)).with_body(
                XmlStack::new()
                    .start_element("view")
                    .attribute("name", "main")
                    .end_element("view"),
            )
        });

        let original = request_text("zoom_to");
        let reply = validate_reply(&original, &responder.respond(&original).unwrap()).unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.reason, "zoomed 12");
        assert_eq!(reply.body.len(), 1);
    }

    #[test]
    fn identifiable_invalid_request_gets_bad_xml() {
        let mut responder = Responder::new(unknown);
        let text = r#"<envelope><request id="3" command="zoom_to" timeout="0"/></envelope>"#;

        let reply_text = responder.respond(text).unwrap();
        let request = RequestBuilder::new("zoom_to")
            .build_with_id(RequestId::new(3).unwrap())
            .unwrap();
        let reply = validate_reply(&request.xml, &reply_text).unwrap();
        assert_eq!(reply.return_code, CommandRc::BadXml);
        assert!(reply.reason.contains("timeout"));
    }

    #[test]
    fn unidentifiable_request_is_an_error() {
        let mut responder = Responder::new(unknown);
        for text in ["<envelope><request", r#"<envelope><request command="x" timeout="5"/></envelope>"#] {
            assert!(matches!(
                responder.respond(text),
                Err(PeerError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn serve_one_answers_channel_request() {
        let (client_end, mut server_end) = MemoryTransport::pair();
        let server = std::thread::spawn(move || {
            let mut responder = Responder::new(unknown);
            let mut served = 0;
            while served < 2 {
                if serve_one(&mut server_end, &mut responder, Duration::from_millis(20)).unwrap() {
                    served += 1;
                }
            }
        });

        let mut channel = Channel::with_config(
            client_end,
            ChannelConfig {
                poll_interval: Duration::from_millis(10),
                ..ChannelConfig::default()
            },
        );
        assert!(channel.request("ping", 5, &XmlStack::new()).unwrap().is_ok());
        let reply = channel.request("load_features", 5, &XmlStack::new()).unwrap();
        assert_eq!(reply.return_code, CommandRc::CmdUnknown);
        server.join().unwrap();
    }

    #[test]
    fn serve_one_reports_idle() {
        let (mut left, _right) = MemoryTransport::pair();
        let mut responder = Responder::new(unknown);
        assert!(!serve_one(&mut left, &mut responder, Duration::from_millis(5)).unwrap());
    }
}
