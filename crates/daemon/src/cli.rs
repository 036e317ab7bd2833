//! Command-line entry point for `updeltad`.
//!
//! Parsing failures surface as exit code `1`. Runtime failures map to the
//! stable exit codes carried by [`DaemonError`].

use std::ffi::OsString;
use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, value_parser};

use crate::{Daemon, DaemonConfig, DaemonError};

const MAX_EXIT_CODE: i32 = 125;

const HELP_TEXT: &str = "\
updeltad - update package share daemon

Usage: updeltad --config <FILE> [--bind <ADDR>] [--port <PORT>]

Options:
      --config <FILE>  JSON share table to serve
      --bind <ADDR>    Listen address, overriding the config file
      --port <PORT>    Listen port, overriding the config file
  -h, --help           Show this help message and exit
  -V, --version        Output version information and exit
";

/// Runs the daemon CLI with the provided arguments and output handles.
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
        Ok(parsed) => execute(parsed, stdout, stderr),
        Err(error) => {
            let _ = writeln!(stderr, "updeltad: {error}");
            1
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
    config: Option<PathBuf>,
    bind: Option<IpAddr>,
    port: Option<u16>,
}

fn clap_command() -> Command {
    Command::new("updeltad")
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
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON share table to serve.")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Listen address, overriding the config file.")
                .value_parser(value_parser!(IpAddr)),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_name("PORT")
                .help("Listen port, overriding the config file.")
                .value_parser(value_parser!(u16)),
        )
}

fn parse_args(mut args: Vec<OsString>) -> Result<ParsedArgs, clap::Error> {
    if args.is_empty() {
        args.push(OsString::from("updeltad"));
    }
    let mut matches = clap_command().try_get_matches_from(args)?;
    Ok(ParsedArgs {
        show_help: matches.get_flag("help"),
        show_version: matches.get_flag("version"),
        config: matches.remove_one::<PathBuf>("config"),
        bind: matches.remove_one::<IpAddr>("bind"),
        port: matches.remove_one::<u16>("port"),
    })
}

fn execute<Out, Err>(parsed: ParsedArgs, stdout: &mut Out, stderr: &mut Err) -> i32
where
    Out: Write,
    Err: Write,
{
    if parsed.show_help {
        let _ = stdout.write_all(HELP_TEXT.as_bytes());
        return 0;
    }
    if parsed.show_version {
        let _ = writeln!(stdout, "updeltad {}", env!("CARGO_PKG_VERSION"));
        return 0;
    }

    let Some(config_path) = parsed.config else {
        let _ = writeln!(stderr, "updeltad: --config <FILE> is required");
        return 1;
    };
    let mut config = match DaemonConfig::load(&config_path) {
        Ok(config) => config,
        Err(error) => return fail(stderr, &error),
    };
    if let Some(bind) = parsed.bind {
        config = config.with_bind_address(bind);
    }
    if let Some(port) = parsed.port {
        config = config.with_port(port);
    }

    let daemon = match Daemon::bind(&config) {
        Ok(daemon) => daemon,
        Err(error) => return fail(stderr, &error),
    };
    match daemon.run() {
        Ok(()) => 0,
        Err(error) => fail(stderr, &error),
    }
}

fn fail<W: Write>(stderr: &mut W, error: &DaemonError) -> i32 {
    let _ = writeln!(stderr, "updeltad: {error}");
    error.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cli(args: &[&str]) -> (i32, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = run(args.iter().copied(), &mut stdout, &mut stderr);
        (
            code,
            String::from_utf8(stdout).expect("stdout utf-8"),
            String::from_utf8(stderr).expect("stderr utf-8"),
        )
    }

    #[test]
    fn help_flag_prints_usage() {
        let (code, stdout, _) = run_cli(&["updeltad", "--help"]);
        assert_eq!(code, 0);
        assert!(stdout.contains("Usage: updeltad"));
    }

    #[test]
    fn version_flag_prints_version() {
        let (code, stdout, _) = run_cli(&["updeltad", "--version"]);
        assert_eq!(code, 0);
        assert!(stdout.starts_with("updeltad "));
    }

    #[test]
    fn missing_config_is_reported() {
        let (code, _, stderr) = run_cli(&["updeltad"]);
        assert_eq!(code, 1);
        assert!(stderr.contains("--config"));
    }

    #[test]
    fn unknown_flags_are_reported() {
        let (code, _, stderr) = run_cli(&["updeltad", "--bogus"]);
        assert_eq!(code, 1);
        assert!(!stderr.is_empty());
    }

    #[test]
    fn unreadable_config_file_exits_with_one() {
        let (code, _, stderr) = run_cli(&["updeltad", "--config", "/nonexistent/updeltad.json"]);
        assert_eq!(code, 1);
        assert!(stderr.contains("cannot read config"));
    }

    #[test]
    fn exit_codes_are_clamped() {
        let zero = format!("{:?}", exit_code_from(0));
        assert_eq!(zero, format!("{:?}", std::process::ExitCode::from(0)));
        let clamped = format!("{:?}", exit_code_from(999));
        assert_eq!(clamped, format!("{:?}", std::process::ExitCode::from(125)));
    }
}
