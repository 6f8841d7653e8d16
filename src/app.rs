//! Command-line entry point: one scan per invocation.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};

use crate::config::Config;
use crate::core::affinity::{AffinityMode, AffinityResolver};
use crate::core::enumerator::ThreadEnumerator;
use crate::core::host::Platform;
use crate::core::report::Report;
use crate::logging::init_logging;

pub const PROGRAM: &str = "threadscope";

/// List the threads of a process with their priority and CPU affinity.
#[derive(Debug, Default, Parser)]
#[command(name = "threadscope", version)]
pub struct Cli {
    /// Process id to scan (decimal)
    #[arg(allow_hyphen_values = true)]
    pub pid: Option<String>,

    /// Path to configuration file (TOML or YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print "unavailable" instead of 0 when a thread's affinity cannot be read
    #[arg(long)]
    pub distinct_affinity: bool,

    /// Append the list of allowed CPUs to every thread line
    #[arg(long)]
    pub cpus: bool,

    /// Arguments after the pid are accepted and ignored
    #[arg(hide = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

/// Settings of a single scan after config and flags are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub affinity_mode: AffinityMode,
    pub mask_width: usize,
    pub show_cpus: bool,
}

impl ScanOptions {
    pub fn from_config(config: &Config, cli: &Cli) -> Self {
        Self {
            affinity_mode: if cli.distinct_affinity {
                AffinityMode::Distinct
            } else {
                config.affinity_mode
            },
            mask_width: config.mask_width,
            show_cpus: config.show_cpus || cli.cpus,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), &Cli::default())
    }
}

/// Parses a process id the way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted, parsing stops at the first
/// non-digit, text without leading digits is 0 and out-of-range values clamp
/// to the `i32` range. The result is reinterpreted as unsigned, so `-1`
/// becomes `u32::MAX`.
pub fn parse_pid(raw: &str) -> u32 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }

    let clamped = value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    clamped as u32
}

/// How a run ended. Only [`Outcome::Listed`] maps to a zero exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Listed { threads: usize },
    Usage,
    InvalidConfig,
    MissingCapability,
    ScanFailed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Listed { .. })
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        if outcome.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Runs one invocation against `platform`, writing the report to `out`.
///
/// The usage check happens before configuration or any host call; the
/// affinity capability is resolved before the snapshot is taken.
pub fn run<P: Platform, W: Write>(platform: &P, cli: &Cli, out: W) -> Outcome {
    let mut report = Report::new(out);

    let Some(raw_pid) = cli.pid.as_deref() else {
        let _ = report.usage(PROGRAM);
        return Outcome::Usage;
    };

    let config = match prepare(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[FATAL] {e:#}");
            return Outcome::InvalidConfig;
        }
    };
    let options = ScanOptions::from_config(&config, cli);
    let mut report = report
        .mask_width(options.mask_width)
        .show_cpus(options.show_cpus);

    let query = match platform.resolve_query() {
        Ok(query) => query,
        Err(e) => {
            error!(error = %e, symbol = P::QUERY_SYMBOL, "affinity capability unavailable");
            let _ = report.missing_capability(P::QUERY_SYMBOL);
            return Outcome::MissingCapability;
        }
    };

    let pid = parse_pid(raw_pid);
    debug!(raw = raw_pid, pid, ?options, "starting scan");
    let _ = report.header(pid);

    let source = platform.snapshot_source();
    let resolver = AffinityResolver::new(query);
    let enumerator = ThreadEnumerator::new(&source, &resolver).with_mode(options.affinity_mode);

    match enumerator.enumerate(pid, &mut report) {
        Ok(threads) => Outcome::Listed { threads },
        Err(e) => {
            error!(pid, error = %e, "thread enumeration failed");
            let _ = report.failure(pid, &e);
            let _ = report.flush();
            Outcome::ScanFailed
        }
    }
}

fn prepare(cli: &Cli) -> anyhow::Result<Config> {
    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Err(e) = init_logging(&config.log_filter) {
        // a subscriber is already installed when embedded or under test
        debug!("logging not initialised: {e}");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_parses_plain_decimal() {
        assert_eq!(parse_pid("1234"), 1234);
        assert_eq!(parse_pid("  42"), 42);
        assert_eq!(parse_pid("+7"), 7);
        assert_eq!(parse_pid("0"), 0);
    }

    #[test]
    fn pid_stops_at_first_non_digit() {
        assert_eq!(parse_pid("12abc"), 12);
        assert_eq!(parse_pid("99 100"), 99);
        assert_eq!(parse_pid("3.5"), 3);
    }

    #[test]
    fn pid_without_digits_is_zero() {
        assert_eq!(parse_pid(""), 0);
        assert_eq!(parse_pid("abc"), 0);
        assert_eq!(parse_pid("-"), 0);
        assert_eq!(parse_pid("0x10"), 0);
    }

    #[test]
    fn negative_and_oversized_pids_wrap_like_a_dword() {
        assert_eq!(parse_pid("-1"), u32::MAX);
        assert_eq!(parse_pid("2147483647"), 2_147_483_647);
        assert_eq!(parse_pid("99999999999999999999"), i32::MAX as u32);
        assert_eq!(parse_pid("-99999999999999999999"), i32::MIN as u32);
    }

    #[test]
    fn flags_override_config() {
        let config = Config {
            mask_width: 4,
            ..Config::default()
        };
        let cli = Cli {
            distinct_affinity: true,
            cpus: true,
            ..Cli::default()
        };
        let options = ScanOptions::from_config(&config, &cli);
        assert_eq!(options.affinity_mode, AffinityMode::Distinct);
        assert_eq!(options.mask_width, 4);
        assert!(options.show_cpus);

        let defaults = ScanOptions::default();
        assert_eq!(defaults.affinity_mode, AffinityMode::Sentinel);
        assert_eq!(defaults.mask_width, 8);
        assert!(!defaults.show_cpus);
    }

    #[test]
    fn only_listing_is_success() {
        assert!(Outcome::Listed { threads: 0 }.is_success());
        assert!(!Outcome::Usage.is_success());
        assert!(!Outcome::MissingCapability.is_success());
        assert!(!Outcome::ScanFailed.is_success());
        assert!(!Outcome::InvalidConfig.is_success());
    }

    #[test]
    fn cli_accepts_negative_pid_text() {
        let cli = Cli::try_parse_from(["threadscope", "--cpus", "-1"]).unwrap();
        assert_eq!(cli.pid.as_deref(), Some("-1"));
        assert!(cli.cpus);

        let cli = Cli::try_parse_from(["threadscope"]).unwrap();
        assert!(cli.pid.is_none());
    }

    #[test]
    fn arguments_after_the_pid_are_ignored() {
        let cli = Cli::try_parse_from(["threadscope", "1234", "extra", "-x"]).unwrap();
        assert_eq!(cli.pid.as_deref(), Some("1234"));
        assert_eq!(cli.rest, ["extra", "-x"]);
        assert_eq!(
            ScanOptions::from_config(&Config::default(), &cli),
            ScanOptions::default()
        );
    }
}
