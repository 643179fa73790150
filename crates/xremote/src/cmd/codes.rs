use xremote_protocol::{CommandRc, ValidateRc};

use crate::cmd::CodesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_codes, CodeOutput, OutputFormat};

pub fn run(_args: CodesArgs, format: OutputFormat) -> CliResult<i32> {
    print_codes(&code_rows(), format);
    Ok(SUCCESS)
}

fn code_rows() -> Vec<CodeOutput> {
    let commands = CommandRc::ALL.into_iter().map(|code| CodeOutput {
        registry: "command",
        token: code.as_str(),
        description: code.description(),
        short_text: None,
    });
    let validation = ValidateRc::ALL.into_iter().map(|code| CodeOutput {
        registry: "validation",
        token: code.as_str(),
        description: code.description(),
        short_text: Some(code.short_text()),
    });
    commands.chain(validation).collect()
}
