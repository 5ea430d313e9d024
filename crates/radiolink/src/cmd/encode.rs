use radiolink_frame::{encode_message, Frame};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let message = args.payload.message()?;
    let mut frame = Frame::new(args.group);
    encode_message(&mut frame, &message).map_err(|err| frame_error("encode failed", err))?;
    print_encoded(&frame, &message, format);
    Ok(SUCCESS)
}
