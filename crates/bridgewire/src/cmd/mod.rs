use std::path::PathBuf;
use std::time::Duration;

use bridgewire_frame::MessageType;
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod loopback;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one message and write the frame.
    Encode(EncodeArgs),
    /// Validate frames and print their headers.
    Decode(DecodeArgs),
    /// Measure request/response round-trips over an in-memory bridge.
    Loopback(LoopbackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Request,
    Response,
    Stream,
    Binary,
    Error,
}

impl From<TypeArg> for MessageType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Request => MessageType::Request,
            TypeArg::Response => MessageType::Response,
            TypeArg::Stream => MessageType::Stream,
            TypeArg::Binary => MessageType::Binary,
            TypeArg::Error => MessageType::Error,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message type.
    #[arg(long = "type", short = 't', value_enum, default_value = "request")]
    pub kind: TypeArg,
    /// Correlation id.
    #[arg(long, default_value = "1")]
    pub id: u32,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Write the frame to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding one or more frames. Reads stdin when omitted.
    pub path: Option<PathBuf>,
    /// Reject frames whose declared payload exceeds this many bytes.
    #[arg(long)]
    pub max_payload: Option<usize>,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Number of round-trips.
    #[arg(long, short = 'n', default_value = "100")]
    pub count: usize,
    /// Request payload size in bytes.
    #[arg(long, default_value = "64")]
    pub size: usize,
    /// Deadline per round-trip (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}
