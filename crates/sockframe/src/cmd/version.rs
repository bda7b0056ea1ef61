use sockframe_frame::{MAX_PAYLOAD, PREFIX_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("sockframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: sockframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SOCKFRAME_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("wire: {PREFIX_SIZE}-byte big-endian length prefix, max payload {MAX_PAYLOAD}");
    println!(
        "features: conn={}, async={}, cli=true",
        cfg!(feature = "conn"),
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
