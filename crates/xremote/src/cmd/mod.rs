use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use xremote_xml::{Element, XmlStack};

use crate::exit::{io_error, xml_error, CliResult};
use crate::output::OutputFormat;

pub mod codes;
pub mod reply;
pub mod request;
pub mod send;
pub mod serve;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a request message.
    Request(RequestArgs),
    /// Build the reply to a request message.
    Reply(ReplyArgs),
    /// Validate a message.
    Validate(ValidateArgs),
    /// List return codes and validation codes.
    Codes(CodesArgs),
    /// Answer requests on a Unix socket.
    Serve(ServeArgs),
    /// Send one request to a Unix socket and print the reply.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Request(args) => request::run(args, format),
        Command::Reply(args) => reply::run(args, format),
        Command::Validate(args) => validate::run(args, format),
        Command::Codes(args) => codes::run(args, format),
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Command name.
    pub command: String,
    /// Reply timeout in seconds.
    #[arg(long, default_value_t = xremote_protocol::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u32,
    /// Id to use instead of 1.
    #[arg(long)]
    pub id: Option<u64>,
    /// XML fragment to nest in the body ("-" for stdin).
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// File holding the request being answered ("-" for stdin).
    pub request: PathBuf,
    /// Return code token.
    #[arg(long, default_value = "ok")]
    pub code: String,
    /// Human-readable reason.
    #[arg(long, default_value = "")]
    pub reason: String,
    /// XML fragment to nest in the body ("-" for stdin).
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageKind {
    /// Envelope structure only.
    Envelope,
    Request,
    /// Reply checked against --request.
    Reply,
    /// Request or reply, whichever the envelope holds.
    Any,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// File holding the message ("-" for stdin).
    pub file: PathBuf,
    /// What the message must be.
    #[arg(long, value_enum, default_value = "any")]
    pub kind: MessageKind,
    /// Original request, required with --kind reply.
    #[arg(long, value_name = "FILE", required_if_eq("kind", "reply"))]
    pub request: Option<PathBuf>,
    /// Reject envelopes without a version attribute.
    #[arg(long)]
    pub require_version: bool,
}

#[derive(Args, Debug, Default)]
pub struct CodesArgs {}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Exit after answering one request.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Command name.
    pub command: String,
    /// Reply timeout in seconds.
    #[arg(long, default_value_t = xremote_protocol::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u32,
    /// XML fragment to nest in the body ("-" for stdin).
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,
    /// How long to keep retrying the connection (e.g. 5s, 500ms).
    #[arg(long, default_value = "2s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Read a whole input file; "-" reads stdin.
pub fn read_input(path: &Path) -> CliResult<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

/// Load an optional body fragment as a token stack.
pub fn read_body(path: Option<&Path>) -> CliResult<XmlStack> {
    let Some(path) = path else {
        return Ok(XmlStack::new());
    };
    let text = read_input(path)?;
    let elements = Element::parse_fragment(&text)
        .map_err(|err| xml_error(&format!("invalid body in {}", path.display()), err))?;
    Ok(XmlStack::from_elements(&elements))
}
