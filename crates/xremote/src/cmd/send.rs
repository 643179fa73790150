use std::io::ErrorKind;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::{Duration, Instant};

use xremote_frame::FrameConfig;
use xremote_peer::{Channel, ChannelConfig, StreamTransport};
use xremote_protocol::Envelope;

use crate::cmd::{read_body, SendArgs};
use crate::exit::{io_error, peer_error, xml_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_reply, OutputFormat, ReplyOutput};

const CONNECT_RETRY: Duration = Duration::from_millis(25);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let connect_timeout = parse_duration(&args.connect_timeout)?;
    let body = read_body(args.body.as_deref())?;

    let stream = connect_with_retry(&args.path, connect_timeout)?;
    let config = ChannelConfig::default();
    let transport = StreamTransport::unix(stream, FrameConfig::default(), config.poll_interval)
        .map_err(|err| peer_error("connection setup failed", err))?;
    let version = config.protocol.protocol_version.clone();
    let mut channel = Channel::with_config(transport, config);

    let reply = channel
        .request(&args.command, args.timeout, &body)
        .map_err(|err| peer_error("send failed", err))?;
    tracing::debug!(id = %reply.id, command = %reply.command, code = %reply.return_code, "reply received");

    let xml = Envelope::new(version, reply.to_element())
        .to_xml()
        .map_err(|err| xml_error("cannot render reply", err))?;
    print_reply(&ReplyOutput::new(&reply, &xml), format);

    Ok(if reply.is_ok() { SUCCESS } else { FAILURE })
}

fn connect_with_retry(path: &Path, timeout: Duration) -> CliResult<UnixStream> {
    let deadline = Instant::now() + timeout;
    loop {
        match UnixStream::connect(path) {
            Ok(stream) => return Ok(stream),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::ConnectionRefused
                ) && Instant::now() < deadline =>
            {
                std::thread::sleep(CONNECT_RETRY);
            }
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("connect to {} timed out: {err}", path.display()),
                ));
            }
            Err(err) => return Err(io_error(&format!("connect to {} failed", path.display()), err)),
        }
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
