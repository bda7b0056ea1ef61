use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cmd::serve::{self, Disposition};
use crate::cmd::ListenArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.buffers.to_config()?;
    let listener = serve::bind(args.bind)?;

    let running = Arc::new(AtomicBool::new(true));
    serve::install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    serve::serve(listener, &config, &running, |conn, message| {
        print_message(&message, conn.peer_addr(), format);
        printed = printed.saturating_add(1);
        if reached(printed, args.count) {
            Disposition::Stop
        } else {
            Disposition::Continue
        }
    })?;

    Ok(SUCCESS)
}

fn reached(printed: usize, count: Option<usize>) -> bool {
    count.is_some_and(|count| printed >= count)
}
