mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "xremote", version, about = "XML remote command protocol CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::MessageKind;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "xremote",
            "send",
            "/tmp/test.sock",
            "zoom_to",
            "--timeout",
            "5",
            "--connect-timeout",
            "500ms",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.command, "zoom_to");
        assert_eq!(args.timeout, 5);
        assert_eq!(args.connect_timeout, "500ms");
    }

    #[test]
    fn validate_reply_requires_original_request() {
        let err = Cli::try_parse_from(["xremote", "validate", "reply.xml", "--kind", "reply"])
            .expect_err("missing --request should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "xremote",
            "validate",
            "reply.xml",
            "--kind",
            "reply",
            "--request",
            "request.xml",
        ])
        .expect("validate args should parse");
        let Command::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.kind, MessageKind::Reply);
    }

    #[test]
    fn request_timeout_defaults() {
        let cli = Cli::try_parse_from(["xremote", "request", "ping", "--format", "raw"])
            .expect("request args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Raw));
        let Command::Request(args) = cli.command else {
            panic!("expected request");
        };
        assert_eq!(args.timeout, xremote_protocol::DEFAULT_TIMEOUT_SECS);
        assert!(args.id.is_none());
    }

    #[test]
    fn parses_serve_once() {
        let cli = Cli::try_parse_from(["xremote", "serve", "/tmp/test.sock", "--once"])
            .expect("serve args should parse");
        assert!(matches!(cli.command, Command::Serve(ref args) if args.once));
    }
}
