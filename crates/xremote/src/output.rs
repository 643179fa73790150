use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xremote_protocol::{CommandRc, Reply, ValidateRc};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A message produced by `request` or `reply`.
#[derive(Serialize)]
pub struct MessageOutput<'a> {
    pub kind: &'a str,
    pub id: u64,
    pub command: &'a str,
    pub xml: &'a str,
}

#[derive(Serialize)]
pub struct ValidationOutput<'a> {
    pub kind: &'a str,
    pub valid: bool,
    pub code: ValidateRc,
    pub short_text: &'a str,
    pub message: &'a str,
}

#[derive(Serialize)]
pub struct ReplyOutput<'a> {
    pub id: u64,
    pub command: &'a str,
    pub return_code: CommandRc,
    pub reason: &'a str,
    pub xml: &'a str,
}

impl<'a> ReplyOutput<'a> {
    pub fn new(reply: &'a Reply, xml: &'a str) -> Self {
        Self {
            id: reply.id.get(),
            command: &reply.command,
            return_code: reply.return_code,
            reason: &reply.reason,
            xml,
        }
    }
}

#[derive(Serialize)]
pub struct CodeOutput {
    pub registry: &'static str,
    pub token: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_text: Option<&'static str>,
}

pub fn print_message(out: &MessageOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["KIND", "ID", "COMMAND", "XML"],
            vec![vec![
                out.kind.to_string(),
                out.id.to_string(),
                out.command.to_string(),
                out.xml.to_string(),
            ]],
        ),
        OutputFormat::Pretty => {
            println!("{} id={} command={}", out.kind, out.id, out.command);
            println!("{}", out.xml);
        }
        OutputFormat::Raw => print_raw(out.xml),
    }
}

pub fn print_validation(out: &ValidationOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["KIND", "CODE", "RESULT", "MESSAGE"],
            vec![vec![
                out.kind.to_string(),
                out.code.to_string(),
                out.short_text.to_string(),
                out.message.to_string(),
            ]],
        ),
        OutputFormat::Pretty => {
            if out.message.is_empty() {
                println!("{}: {} ({})", out.kind, out.code, out.short_text);
            } else {
                println!(
                    "{}: {} ({}) {}",
                    out.kind, out.code, out.short_text, out.message
                );
            }
        }
        OutputFormat::Raw => println!("{}", out.code),
    }
}

pub fn print_reply(out: &ReplyOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => print_table(
            &["ID", "COMMAND", "RETURN CODE", "REASON"],
            vec![vec![
                out.id.to_string(),
                out.command.to_string(),
                out.return_code.to_string(),
                out.reason.to_string(),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "reply id={} command={} return_code={} reason={}",
            out.id, out.command, out.return_code, out.reason
        ),
        OutputFormat::Raw => print_raw(out.xml),
    }
}

pub fn print_codes(rows: &[CodeOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => print_table(
            &["REGISTRY", "TOKEN", "DESCRIPTION", "SHORT TEXT"],
            rows.iter()
                .map(|row| {
                    vec![
                        row.registry.to_string(),
                        row.token.to_string(),
                        row.description.to_string(),
                        row.short_text.unwrap_or("").to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in rows {
                println!("{:<10} {:<18} {}", row.registry, row.token, row.description);
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_raw(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.write_all(b"\n");
    let _ = out.flush();
}
