use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use radiolink_frame::MessageKind;
use radiolink_hal::UdpRadio;
use radiolink_radio::Radio;
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{hal_error, radio_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
    let mut config = args.radio.load()?;
    config.filter_group = !args.all_groups;

    // Listening never transmits, so the destination is only a placeholder.
    let device =
        UdpRadio::bind(args.bind, args.bind).map_err(|err| hal_error("bind failed", err))?;
    let mut radio =
        Radio::new(device, config).map_err(|err| radio_error("radio setup failed", err))?;
    for kind in MessageKind::ALL {
        radio.on_message(kind, move |_, frame| print_frame(frame, format));
    }
    radio.on_unknown(move |frame| print_frame(frame, format));
    radio
        .enable()
        .map_err(|err| radio_error("radio enable failed", err))?;
    info!(bind = %args.bind, group = radio.group(), "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let deadline = timeout.map(|timeout| Instant::now() + timeout);
    let mut printed = 0usize;
    let mut timed_out = false;

    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
        let wait = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    timed_out = true;
                    break;
                }
                remaining.min(POLL_INTERVAL)
            }
            None => POLL_INTERVAL,
        };
        if radio.wait_for(wait) {
            printed = printed.saturating_add(1);
        }
    }

    let stats = radio.stats();
    info!(
        printed,
        received = stats.received,
        dropped_pool_exhausted = stats.dropped_pool_exhausted,
        dropped_queue_full = stats.dropped_queue_full,
        dropped_foreign_group = stats.dropped_foreign_group,
        dropped_malformed = stats.dropped_malformed,
        "listen finished"
    );
    radio
        .disable()
        .map_err(|err| radio_error("radio disable failed", err))?;

    // A deadline without --count is just how long to listen.
    match args.count {
        Some(count) if timed_out => Err(CliError::new(
            TIMEOUT,
            format!("timed out after {printed} of {count} frames"),
        )),
        _ => Ok(SUCCESS),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
