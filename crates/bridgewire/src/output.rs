use std::io::{IsTerminal, Write};

use bridgewire_frame::Message;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
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

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'a str,
    kind_code: u8,
    id: u32,
    version: u8,
    payload_size: usize,
    wire_size: usize,
    payload: String,
}

pub fn print_message(msg: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: msg.kind().name(),
                kind_code: msg.kind().into(),
                id: msg.id(),
                version: msg.header().version,
                payload_size: msg.payload().len(),
                wire_size: msg.wire_size(),
                payload: payload_preview(msg.payload()),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "ID", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    msg.kind().name().to_string(),
                    msg.id().to_string(),
                    msg.payload().len().to_string(),
                    payload_preview(msg.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} id={} size={} payload={}",
                msg.kind(),
                msg.id(),
                msg.payload().len(),
                payload_preview(msg.payload())
            );
        }
        OutputFormat::Raw => {
            print_raw(msg.payload());
        }
    }
}

/// Print a flat record of named fields in the requested format.
pub fn print_record(fields: &[(&str, Value)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let object: Map<String, Value> = fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect();
            println!("{}", Value::Object(object));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in fields {
                table.add_row(vec![key.to_string(), display_value(value)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = fields
                .iter()
                .map(|(key, value)| format!("{key}={}", display_value(value)))
                .collect();
            println!("{}", line.join(" "));
        }
        OutputFormat::Raw => {
            for (key, value) in fields {
                println!("{key}={}", display_value(value));
            }
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
