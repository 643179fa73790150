use xremote_protocol::{IdGenerator, RequestBuilder, RequestId};

use crate::cmd::{read_body, RequestArgs};
use crate::exit::{protocol_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, MessageOutput, OutputFormat};

pub fn run(args: RequestArgs, format: OutputFormat) -> CliResult<i32> {
    let body = read_body(args.body.as_deref())?;
    let builder = RequestBuilder::new(args.command)
        .timeout_secs(args.timeout)
        .body(body);

    let outgoing = match args.id {
        Some(id) => {
            let id = RequestId::new(id).ok_or_else(|| CliError::new(USAGE, "--id must not be 0"))?;
            builder.build_with_id(id)
        }
        None => builder.build(&IdGenerator::new()),
    }
    .map_err(|err| protocol_error("cannot build request", err))?;

    print_message(
        &MessageOutput {
            kind: "request",
            id: outgoing.request.id.get(),
            command: &outgoing.request.command,
            xml: &outgoing.xml,
        },
        format,
    );
    Ok(SUCCESS)
}
