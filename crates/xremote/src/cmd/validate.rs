use xremote_protocol::{ProtocolConfig, ValidateRc, ValidationError, Validator};

use crate::cmd::{read_input, MessageKind, ValidateArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_validation, OutputFormat, ValidationOutput};

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let text = read_input(&args.file)?;
    let original = match &args.request {
        Some(path) => Some(read_input(path)?),
        None => None,
    };

    let validator = Validator::with_config(ProtocolConfig {
        require_version: args.require_version,
        ..ProtocolConfig::default()
    });
    let (kind, result) = check(&validator, args.kind, &text, original.as_deref())?;
    let code = ValidateRc::of(&result);
    let message = result.err().map(|err| err.message).unwrap_or_default();

    print_validation(
        &ValidationOutput {
            kind,
            valid: code == ValidateRc::Ok,
            code,
            short_text: code.short_text(),
            message: &message,
        },
        format,
    );

    if code == ValidateRc::Ok {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

fn check(
    validator: &Validator,
    kind: MessageKind,
    text: &str,
    original: Option<&str>,
) -> CliResult<(&'static str, Result<(), ValidationError>)> {
    let checked = match kind {
        MessageKind::Envelope => ("envelope", validator.validate_envelope(text).map(drop)),
        MessageKind::Request => ("request", validator.validate_request(text).map(drop)),
        MessageKind::Reply => {
            let original = original
                .ok_or_else(|| CliError::new(USAGE, "--kind reply requires --request"))?;
            ("reply", validator.validate_reply(original, text).map(drop))
        }
        MessageKind::Any => match validator.validate_message(text) {
            Ok(message) => (message.kind().tag(), Ok(())),
            Err(err) => ("message", Err(err)),
        },
    };
    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str =
        r#"<envelope version="1.0"><request id="7" command="ping" timeout="5"/></envelope>"#;
    const REPLY: &str = r#"<envelope version="1.0"><reply id="7" command="ping" return_code="ok" reason=""/></envelope>"#;

    #[test]
    fn any_kind_reports_body_tag() {
        let validator = Validator::new();
        let (kind, result) = check(&validator, MessageKind::Any, REPLY, None).unwrap();
        assert_eq!(kind, "reply");
        assert!(result.is_ok());
    }

    #[test]
    fn reply_kind_needs_original() {
        let validator = Validator::new();
        let err = check(&validator, MessageKind::Reply, REPLY, None).unwrap_err();
        assert_eq!(err.code, USAGE);

        let (_, result) = check(&validator, MessageKind::Reply, REPLY, Some(REQUEST)).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn failures_carry_their_code() {
        let validator = Validator::new();
        let (_, result) = check(&validator, MessageKind::Request, "<envelope>", None).unwrap();
        assert_eq!(ValidateRc::of(&result), ValidateRc::EnvelopeXml);
    }
}
