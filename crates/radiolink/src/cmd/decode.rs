use radiolink_frame::{decode_frame, decode_message};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// Decode one frame. A well-formed frame that is not a datagram is still
/// printed, but exits with `DATA_INVALID`.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let compact: String = args.hex.split_whitespace().collect();
    let bytes = hex::decode(&compact)
        .map_err(|err| CliError::usage(format!("invalid hex input: {err}")))?;
    let frame = decode_frame(&bytes).map_err(|err| frame_error("decode failed", err))?;

    print_frame(&frame, format);
    match decode_message(&frame) {
        Ok(_) => Ok(SUCCESS),
        Err(_) => Ok(DATA_INVALID),
    }
}
