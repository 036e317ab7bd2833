//! Command-line entry point for `updelta`.
//!
//! Parsing failures surface as exit code `1`. Runtime failures map to the
//! stable codes carried by [`ExitCode`](crate::ExitCode).

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, value_parser};
use logging::{DiagnosticEvent, VerbosityConfig};
use publish::PublisherConfig;
use share::ShareConfig;

use crate::config::BuildParams;
use crate::exit::ExitCode;
use crate::pipeline::{BuildLayout, BuildPipeline, PipelineError};

const MAX_EXIT_CODE: i32 = 125;

const DEFAULT_SHARE_PORT: u16 = 9440;

const HELP_TEXT: &str = "\
updelta - incremental update package builder

Usage: updelta [--config <FILE>] [--build-root <DIR>] [-v...]
               [--share-host <HOST> --share <NAME> [--share-port <PORT>]
                [--subtree <PATH>] [--username <USER>] [--password <PASS>]]

Options:
      --config <FILE>      JSON build configuration (default: config.json)
      --build-root <DIR>   Build tree root (default: build)
      --share-host <HOST>  Daemon host to publish the built package to
      --share-port <PORT>  Daemon port (default: 9440)
      --share <NAME>       Share name on the daemon
      --subtree <PATH>     Working subtree inside the share
      --username <USER>    Share credential
      --password <PASS>    Share credential
  -v, --verbose            Increase verbosity; may be repeated
  -h, --help               Show this help message and exit
  -V, --version            Output version information and exit
";

/// Runs the client CLI with the provided arguments and output handles.
///
/// Returns the process exit code the caller should use.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    match parse_args(args) {
        Ok(parsed) => execute(&parsed, stdout, stderr),
        Err(error) => {
            let _ = writeln!(stderr, "updelta: {error}");
            ExitCode::Usage.code()
        }
    }
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(u8::try_from(clamped).unwrap_or(1))
}

struct ParsedArgs {
    show_help: bool,
    show_version: bool,
    verbose: u8,
    config: PathBuf,
    build_root: PathBuf,
    share_host: Option<String>,
    share_port: u16,
    share: Option<String>,
    subtree: String,
    username: String,
    password: String,
}

fn clap_command() -> Command {
    Command::new("updelta")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("help")
                .long("help")
                .short('h')
                .help("Show this help message and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase verbosity; may be repeated.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON build configuration.")
                .default_value("config.json")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("build-root")
                .long("build-root")
                .value_name("DIR")
                .help("Build tree root.")
                .default_value("build")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("share-host")
                .long("share-host")
                .value_name("HOST")
                .help("Daemon host to publish the built package to."),
        )
        .arg(
            Arg::new("share-port")
                .long("share-port")
                .value_name("PORT")
                .help("Daemon port.")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("share")
                .long("share")
                .value_name("NAME")
                .help("Share name on the daemon."),
        )
        .arg(
            Arg::new("subtree")
                .long("subtree")
                .value_name("PATH")
                .help("Working subtree inside the share.")
                .default_value(""),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .value_name("USER")
                .help("Share credential.")
                .default_value(""),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .value_name("PASS")
                .help("Share credential.")
                .default_value(""),
        )
}

fn parse_args(mut args: Vec<OsString>) -> Result<ParsedArgs, clap::Error> {
    if args.is_empty() {
        args.push(OsString::from("updelta"));
    }
    let mut matches = clap_command().try_get_matches_from(args)?;
    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        verbose: matches.get_count("verbose"),
        config: matches.remove_one::<PathBuf>("config").unwrap_or_default(),
        build_root: matches
            .remove_one::<PathBuf>("build-root")
            .unwrap_or_default(),
        share_host: matches.remove_one::<String>("share-host"),
        share_port: matches
            .remove_one::<u16>("share-port")
            .unwrap_or(DEFAULT_SHARE_PORT),
        share: matches.remove_one::<String>("share"),
        subtree: matches.remove_one::<String>("subtree").unwrap_or_default(),
        username: matches.remove_one::<String>("username").unwrap_or_default(),
        password: matches.remove_one::<String>("password").unwrap_or_default(),
    })
}

fn execute<Out, Err>(parsed: &ParsedArgs, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    if parsed.show_help {
        let _ = stdout.write_all(HELP_TEXT.as_bytes());
        return ExitCode::Success.code();
    }
    if parsed.show_version {
        let _ = writeln!(stdout, "updelta {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::Success.code();
    }

    logging::init(VerbosityConfig::from_verbose_level(parsed.verbose));

    let share = match share_config(parsed) {
        Ok(share) => share,
        Err(message) => {
            let _ = writeln!(stderr, "updelta: {message}");
            return ExitCode::Usage.code();
        }
    };
    let params = match BuildParams::load(&parsed.config) {
        Ok(params) => params,
        Err(error) => return fail(stderr, &PipelineError::Config(error)),
    };

    let layout = BuildLayout::new(&parsed.build_root);
    let pipeline = BuildPipeline::new(layout, params, share);
    let outcome = pipeline.run();
    flush_events(stderr);
    match outcome {
        Ok(package) => {
            let _ = writeln!(stdout, "{}", package.display());
            ExitCode::Success.code()
        }
        Err(error) => fail(stderr, &error),
    }
}

/// Writes the diagnostics collected during the run to stderr.
fn flush_events<W: Write>(stderr: &mut W) {
    for event in logging::drain_events() {
        let (DiagnosticEvent::Info { message, .. } | DiagnosticEvent::Debug { message, .. }) =
            event;
        let _ = writeln!(stderr, "{message}");
    }
}

fn share_config(parsed: &ParsedArgs) -> Result<Option<PublisherConfig>, &'static str> {
    match (&parsed.share_host, &parsed.share) {
        (Some(host), Some(share)) => Ok(Some(PublisherConfig::new(ShareConfig::new(
            host,
            parsed.share_port,
            share,
            &parsed.subtree,
            &parsed.username,
            &parsed.password,
        )))),
        (None, None) => Ok(None),
        _ => Err("publishing requires both --share-host and --share"),
    }
}

fn fail<W: Write>(stderr: &mut W, error: &PipelineError) -> i32 {
    let _ = writeln!(stderr, "updelta: {error}");
    ExitCode::from(error).code()
}
