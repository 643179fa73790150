//! Return-code and validation-code registries.
//!
//! Each registry is a static table mapping a code to its wire token and
//! human-readable texts. Lookups in both directions go through the table, so
//! a token that is not listed fails with [`ProtocolError::UnknownCode`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ProtocolError, ValidationError};

/// Outcome of executing a command, carried in a reply's `return_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandRc {
    Ok,
    Failed,
    BadArgs,
    ViewUnknown,
    CmdUnknown,
    BadXml,
}

/// Where validation of a message failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidateRc {
    Ok,
    BodyCommand,
    BodyContent,
    BodyXml,
    EnvelopeContent,
    EnvelopeXml,
}

struct CommandRcEntry {
    code: CommandRc,
    token: &'static str,
    description: &'static str,
}

struct ValidateRcEntry {
    code: ValidateRc,
    token: &'static str,
    description: &'static str,
    short_text: &'static str,
}

// Entries are indexed by discriminant; order must match the enum.
static COMMAND_RC_TABLE: [CommandRcEntry; 6] = [
    CommandRcEntry {
        code: CommandRc::Ok,
        token: "ok",
        description: "Command succeeded",
    },
    CommandRcEntry {
        code: CommandRc::Failed,
        token: "failed",
        description: "Command failed",
    },
    CommandRcEntry {
        code: CommandRc::BadArgs,
        token: "bad_args",
        description: "Command arguments were invalid",
    },
    CommandRcEntry {
        code: CommandRc::ViewUnknown,
        token: "view_unknown",
        description: "Target view is not known",
    },
    CommandRcEntry {
        code: CommandRc::CmdUnknown,
        token: "cmd_unknown",
        description: "Command is not recognised",
    },
    CommandRcEntry {
        code: CommandRc::BadXml,
        token: "bad_xml",
        description: "Request XML could not be processed",
    },
];

static VALIDATE_RC_TABLE: [ValidateRcEntry; 6] = [
    ValidateRcEntry {
        code: ValidateRc::Ok,
        token: "ok",
        description: "Message is valid",
        short_text: "OK",
    },
    ValidateRcEntry {
        code: ValidateRc::BodyCommand,
        token: "body_command",
        description: "Body command is missing or empty",
        short_text: "Bad command",
    },
    ValidateRcEntry {
        code: ValidateRc::BodyContent,
        token: "body_content",
        description: "Body attributes or content are invalid",
        short_text: "Bad body",
    },
    ValidateRcEntry {
        code: ValidateRc::BodyXml,
        token: "body_xml",
        description: "Body XML is not well-formed",
        short_text: "Bad body XML",
    },
    ValidateRcEntry {
        code: ValidateRc::EnvelopeContent,
        token: "envelope_content",
        description: "Envelope does not wrap exactly one request or reply",
        short_text: "Bad envelope",
    },
    ValidateRcEntry {
        code: ValidateRc::EnvelopeXml,
        token: "envelope_xml",
        description: "Envelope XML is not well-formed",
        short_text: "Bad envelope XML",
    },
];

impl CommandRc {
    /// Every code, in registry order.
    pub const ALL: [CommandRc; 6] = [
        CommandRc::Ok,
        CommandRc::Failed,
        CommandRc::BadArgs,
        CommandRc::ViewUnknown,
        CommandRc::CmdUnknown,
        CommandRc::BadXml,
    ];

    fn entry(self) -> &'static CommandRcEntry {
        &COMMAND_RC_TABLE[self as usize]
    }

    /// Wire token.
    pub fn as_str(self) -> &'static str {
        self.entry().token
    }

    pub fn description(self) -> &'static str {
        self.entry().description
    }

    pub fn is_ok(self) -> bool {
        self == CommandRc::Ok
    }
}

impl ValidateRc {
    /// Every code, in registry order.
    pub const ALL: [ValidateRc; 6] = [
        ValidateRc::Ok,
        ValidateRc::BodyCommand,
        ValidateRc::BodyContent,
        ValidateRc::BodyXml,
        ValidateRc::EnvelopeContent,
        ValidateRc::EnvelopeXml,
    ];

    fn entry(self) -> &'static ValidateRcEntry {
        &VALIDATE_RC_TABLE[self as usize]
    }

    /// Wire token.
    pub fn as_str(self) -> &'static str {
        self.entry().token
    }

    pub fn description(self) -> &'static str {
        self.entry().description
    }

    /// Short display text.
    pub fn short_text(self) -> &'static str {
        self.entry().short_text
    }

    /// True for the two not-well-formed codes.
    pub fn is_xml(self) -> bool {
        matches!(self, ValidateRc::BodyXml | ValidateRc::EnvelopeXml)
    }

    /// Code for a validation result: `Ok` on success, the failure code otherwise.
    pub fn of<T>(result: &std::result::Result<T, ValidationError>) -> ValidateRc {
        match result {
            Ok(_) => ValidateRc::Ok,
            Err(err) => err.code,
        }
    }
}

impl FromStr for CommandRc {
    type Err = ProtocolError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        COMMAND_RC_TABLE
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| entry.code)
            .ok_or_else(|| ProtocolError::UnknownCode {
                registry: "command",
                token: token.to_string(),
            })
    }
}

impl FromStr for ValidateRc {
    type Err = ProtocolError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        VALIDATE_RC_TABLE
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| entry.code)
            .ok_or_else(|| ProtocolError::UnknownCode {
                registry: "validation",
                token: token.to_string(),
            })
    }
}

impl fmt::Display for CommandRc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ValidateRc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_in_discriminant_order() {
        for (index, entry) in COMMAND_RC_TABLE.iter().enumerate() {
            assert_eq!(entry.code as usize, index);
        }
        for (index, entry) in VALIDATE_RC_TABLE.iter().enumerate() {
            assert_eq!(entry.code as usize, index);
        }
    }

    #[test]
    fn command_codes_roundtrip_through_tokens() {
        for code in CommandRc::ALL {
            assert_eq!(code.as_str().parse::<CommandRc>().unwrap(), code);
        }
    }

    #[test]
    fn validate_codes_roundtrip_through_tokens() {
        for code in ValidateRc::ALL {
            assert_eq!(code.as_str().parse::<ValidateRc>().unwrap(), code);
        }
    }

    #[test]
    fn wire_tokens_are_lowercase_and_unique() {
        let tokens: std::collections::HashSet<&str> =
            CommandRc::ALL.iter().map(|code| code.as_str()).collect();
        assert_eq!(tokens.len(), CommandRc::ALL.len());
        assert!(tokens.iter().all(|t| t.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
    }

    #[test]
    fn unknown_tokens_fail_distinctly() {
        assert!(matches!(
            "OK".parse::<CommandRc>(),
            Err(ProtocolError::UnknownCode { registry: "command", .. })
        ));
        assert!(matches!(
            "".parse::<CommandRc>(),
            Err(ProtocolError::UnknownCode { .. })
        ));
        assert!(matches!(
            "body".parse::<ValidateRc>(),
            Err(ProtocolError::UnknownCode { registry: "validation", .. })
        ));
    }

    #[test]
    fn serde_names_match_wire_tokens() {
        for code in CommandRc::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
        for code in ValidateRc::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn xml_codes_and_display() {
        assert!(ValidateRc::BodyXml.is_xml());
        assert!(ValidateRc::EnvelopeXml.is_xml());
        assert!(!ValidateRc::BodyContent.is_xml());
        assert_eq!(ValidateRc::EnvelopeContent.to_string(), "envelope_content");
        assert_eq!(ValidateRc::BodyCommand.short_text(), "Bad command");
        assert_eq!(CommandRc::CmdUnknown.to_string(), "cmd_unknown");
    }
}
