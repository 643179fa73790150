use xremote_protocol::{create_reply_from_request, validate_reply, CommandRc};

use crate::cmd::{read_body, read_input, ReplyArgs};
use crate::exit::{protocol_error, validation_error, CliResult, SUCCESS};
use crate::output::{print_message, MessageOutput, OutputFormat};

pub fn run(args: ReplyArgs, format: OutputFormat) -> CliResult<i32> {
    let code = args
        .code
        .parse::<CommandRc>()
        .map_err(|err| protocol_error("invalid --code", err))?;
    let original = read_input(&args.request)?;
    let body = read_body(args.body.as_deref())?;

    let xml = create_reply_from_request(&original, code, &args.reason, &body)
        .map_err(|err| protocol_error("cannot build reply", err))?;
    let reply = validate_reply(&original, &xml)
        .map_err(|err| validation_error("built reply does not validate", err))?;

    print_message(
        &MessageOutput {
            kind: "reply",
            id: reply.id.get(),
            command: &reply.command,
            xml: &xml,
        },
        format,
    );
    Ok(SUCCESS)
}
