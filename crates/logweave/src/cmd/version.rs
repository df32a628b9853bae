use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("logweave {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: logweave");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("build_target: {}", env!("LOGWEAVE_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "transports: docker-unix={}",
        cfg!(unix)
    );

    Ok(SUCCESS)
}
