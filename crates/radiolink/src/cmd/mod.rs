use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use radiolink_frame::Message;
use radiolink_radio::RadioConfig;

use crate::exit::{io_error, radio_error, CliError, CliResult, DATA_INVALID};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod envinfo;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Broadcast a single datagram over a UDP-simulated radio.
    Send(SendArgs),
    /// Receive datagrams and print them.
    Listen(ListenArgs),
    /// Print the wire bytes of a datagram without sending it.
    Encode(EncodeArgs),
    /// Decode a frame given as hex.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

/// The datagram to send or encode. Exactly one value flag is required.
#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Integer value.
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["double", "string"])]
    pub int: Option<i32>,
    /// Double value.
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["int", "string"])]
    pub double: Option<f64>,
    /// String value (at most 30 bytes).
    #[arg(long, conflicts_with_all = ["int", "double", "key"])]
    pub string: Option<String>,
    /// Send the number as a keyed value under this name.
    #[arg(long)]
    pub key: Option<String>,
}

impl PayloadArgs {
    pub fn message(&self) -> CliResult<Message<'_>> {
        let key = self.key.as_deref();
        match (self.int, self.double, self.string.as_deref()) {
            (Some(value), None, None) => Ok(match key {
                Some(key) => Message::keyed(key, value),
                None => Message::number(value),
            }),
            (None, Some(value), None) => Ok(match key {
                Some(key) => Message::keyed(key, value),
                None => Message::number(value),
            }),
            (None, None, Some(text)) if key.is_none() => Ok(Message::string(text)),
            _ => Err(CliError::usage(
                "exactly one of --int, --double or --string is required",
            )),
        }
    }
}

/// Radio settings shared by commands that open a device.
#[derive(Args, Debug, Default)]
pub struct RadioArgs {
    /// JSON radio configuration file; flags below override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Radio group (0-255).
    #[arg(long)]
    pub group: Option<u8>,
    /// Frequency band (0-100).
    #[arg(long)]
    pub band: Option<u8>,
    /// Transmit power (0-7).
    #[arg(long)]
    pub power: Option<u8>,
}

impl RadioArgs {
    pub fn load(&self) -> CliResult<RadioConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    io_error(&format!("failed reading {}", path.display()), err)
                })?;
                serde_json::from_str::<RadioConfig>(&raw).map_err(|err| {
                    CliError::new(
                        DATA_INVALID,
                        format!("invalid radio config {}: {err}", path.display()),
                    )
                })?
            }
            None => RadioConfig::default(),
        };
        if let Some(group) = self.group {
            config.group = group;
        }
        if let Some(band) = self.band {
            config.band = band;
        }
        if let Some(power) = self.power {
            config.power = power;
        }
        config
            .validate()
            .map_err(|err| radio_error("invalid radio settings", err))?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address of the listening station.
    pub destination: SocketAddr,
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0:0")]
    pub bind: SocketAddr,
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub radio: RadioArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind.
    pub bind: SocketAddr,
    /// Print frames from every group, not only our own.
    #[arg(long)]
    pub all_groups: bool,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Stop listening after this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    #[command(flatten)]
    pub radio: RadioArgs,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Radio group stamped into the header.
    #[arg(long, default_value_t = radiolink_hal::DEFAULT_GROUP)]
    pub group: u8,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex, header included.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
