use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use radiolink_frame::{decode_message, Frame, Message};
use serde::Serialize;

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
struct FrameOutput<'a> {
    group: u8,
    version: u8,
    protocol: u8,
    rssi: i32,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    hex: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &'a Frame) -> Self {
        let (message, error) = match decode_message(frame) {
            Ok(message) => (Some(message), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            group: frame.group(),
            version: frame.version(),
            protocol: frame.protocol(),
            rssi: frame.rssi(),
            size: frame.wire_size(),
            message,
            error,
            hex: hex::encode(frame.wire_bytes()),
        }
    }
}

/// Print one received or decoded frame.
pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let out = FrameOutput::new(frame);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let (kind, key, value) = describe(&out);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["GROUP", "RSSI", "TYPE", "KEY", "VALUE"])
                .add_row(vec![
                    out.group.to_string(),
                    out.rssi.to_string(),
                    kind,
                    key,
                    value,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let (kind, key, value) = describe(&out);
            if key.is_empty() {
                println!(
                    "group={} rssi={} type={} value={}",
                    out.group, out.rssi, kind, value
                );
            } else {
                println!(
                    "group={} rssi={} type={} key={} value={}",
                    out.group, out.rssi, kind, key, value
                );
            }
        }
        OutputFormat::Raw => print_raw(frame.wire_bytes()),
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    size: usize,
    message: &'a Message<'a>,
    hex: String,
}

/// Print the wire form of a freshly encoded frame.
pub fn print_encoded(frame: &Frame, message: &Message<'_>, format: OutputFormat) {
    let hex = hex::encode(frame.wire_bytes());
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            size: frame.wire_size(),
            message,
            hex,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "SIZE", "HEX"])
                .add_row(vec![
                    message.kind().name().to_string(),
                    frame.wire_size().to_string(),
                    hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(frame.wire_bytes()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Split a frame into (type, key, value) columns for human output.
fn describe(out: &FrameOutput<'_>) -> (String, String, String) {
    let Some(message) = out.message else {
        let reason = out.error.clone().unwrap_or_default();
        return ("unknown".to_string(), String::new(), format!("{} ({reason})", out.hex));
    };
    let kind = message.kind().name().to_string();
    match message {
        Message::Int { value } => (kind, String::new(), value.to_string()),
        Message::Double { value } => (kind, String::new(), value.to_string()),
        Message::String { text } => (kind, String::new(), text.to_string()),
        Message::KeyedInt { key, value } => (kind, key.to_string(), value.to_string()),
        Message::KeyedDouble { key, value } => (kind, key.to_string(), value.to_string()),
    }
}
