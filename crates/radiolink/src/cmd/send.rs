use radiolink_hal::UdpRadio;
use radiolink_radio::Radio;
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{hal_error, radio_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, _format: OutputFormat) -> CliResult<i32> {
    let config = args.radio.load()?;
    let message = args.payload.message()?;

    let device = UdpRadio::bind(args.bind, args.destination)
        .map_err(|err| hal_error("bind failed", err))?;
    let mut radio =
        Radio::new(device, config).map_err(|err| radio_error("radio setup failed", err))?;
    radio
        .enable()
        .map_err(|err| radio_error("radio enable failed", err))?;

    radio
        .send_message(&message)
        .map_err(|err| radio_error("send failed", err))?;
    info!(
        kind = message.kind().name(),
        destination = %args.destination,
        group = radio.group(),
        "datagram sent"
    );

    radio
        .disable()
        .map_err(|err| radio_error("radio disable failed", err))?;
    Ok(SUCCESS)
}
