use radiolink_frame::{FRAME_VERSION, MAX_FRAME_SIZE, PROTOCOL_DATAGRAM};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("radiolink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: radiolink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("frame_version: {FRAME_VERSION}");
    println!("datagram_protocol: {PROTOCOL_DATAGRAM}");
    println!("max_frame_size: {MAX_FRAME_SIZE}");
    println!("features: radio={}, cli=true", cfg!(feature = "radio"));

    Ok(SUCCESS)
}
