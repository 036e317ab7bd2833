#![deny(unsafe_code)]

use std::{env, io, process::ExitCode};

use logging::VerbosityConfig;
use mimalloc::MiMalloc;

/// High-performance memory allocator for improved allocation throughput.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    logging::init_tracing_with_filter(
        VerbosityConfig::default(),
        tracing_subscriber::EnvFilter::from_default_env(),
    );

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let status = daemon::run(env::args_os(), &mut stdout, &mut stderr);
    daemon::exit_code_from(status)
}
