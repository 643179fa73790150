use std::io::ErrorKind;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xremote_frame::FrameConfig;
use xremote_peer::{
    serve_one, CommandHandler, HandlerReply, PeerError, Responder, StreamTransport,
    DEFAULT_POLL_INTERVAL,
};
use xremote_protocol::{CommandRc, Request};

use crate::cmd::ServeArgs;
use crate::exit::{io_error, peer_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let listener = UnixListener::bind(&args.path)
        .map_err(|err| io_error(&format!("bind {} failed", args.path.display()), err))?;
    let _cleanup = SocketCleanup(&args.path);
    listener
        .set_nonblocking(true)
        .map_err(|err| io_error("listener setup failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    tracing::info!(path = %args.path.display(), "serving requests");

    let mut responder = Responder::new(unknown_command);
    while running.load(Ordering::SeqCst) {
        let stream = match listener.accept() {
            Ok((stream, _)) => stream,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(DEFAULT_POLL_INTERVAL);
                continue;
            }
            Err(err) => return Err(io_error("accept failed", err)),
        };

        let served = serve_connection(stream, &mut responder, &running, args.once)?;
        if args.once && served > 0 {
            break;
        }
    }

    Ok(SUCCESS)
}

/// Answer requests on one connection until it closes; returns how many were answered.
fn serve_connection<H: CommandHandler>(
    stream: UnixStream,
    responder: &mut Responder<H>,
    running: &AtomicBool,
    once: bool,
) -> CliResult<usize> {
    stream
        .set_nonblocking(false)
        .map_err(|err| io_error("connection setup failed", err))?;
    let mut transport = StreamTransport::unix(stream, FrameConfig::default(), DEFAULT_POLL_INTERVAL)
        .map_err(|err| peer_error("connection setup failed", err))?;

    let mut served = 0usize;
    while running.load(Ordering::SeqCst) {
        match serve_one(&mut transport, responder, DEFAULT_POLL_INTERVAL) {
            Ok(true) => {
                served += 1;
                if once {
                    break;
                }
            }
            Ok(false) => {}
            Err(PeerError::Disconnected) => {
                tracing::debug!("client disconnected");
                break;
            }
            Err(PeerError::InvalidRequest(err)) => {
                tracing::warn!(code = %err.code, reason = %err.message, "dropped unanswerable request");
            }
            Err(err) => return Err(peer_error("serve failed", err)),
        }
    }
    Ok(served)
}

fn unknown_command(request: &Request) -> HandlerReply {
    tracing::info!(id = %request.id, command = %request.command, "unknown command");
    HandlerReply::new(
        CommandRc::CmdUnknown,
        format!("unknown command '{}'", request.command),
    )
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

struct SocketCleanup<'a>(&'a Path);

impl Drop for SocketCleanup<'_> {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.0);
    }
}
