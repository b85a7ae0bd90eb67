//! Command-line settings shared by every binary that drives a scroll area.

use clap::Args;
use std::path::PathBuf;

/// Env var that overrides where JSON trace logs are written.
pub const TRACE_LOG_ENV: &str = "PINBAR_TRACE_LOG";

#[derive(Debug, Clone, Default, Args)]
pub struct AppConfig {
    /// Write JSON debug logs to the trace file
    #[arg(long = "logs", default_value_t = false)]
    pub logs: bool,

    /// Disable all logging (overrides --logs)
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,

    /// Trace log destination (defaults to pinbar_trace.jsonl in the temp dir)
    #[arg(long = "trace-log", env = TRACE_LOG_ENV, value_name = "PATH")]
    pub trace_log: Option<PathBuf>,

    /// Hide the elapsed/remaining/rate suffix
    #[arg(long = "no-stats", default_value_t = false)]
    pub no_stats: bool,

    /// Leave SIGINT alone instead of releasing the row on Ctrl-C
    #[arg(long = "no-trap", default_value_t = false)]
    pub no_trap: bool,
}

impl AppConfig {
    #[inline]
    pub fn show_statistics(&self) -> bool {
        !self.no_stats
    }

    #[inline]
    pub fn trap_interrupts(&self) -> bool {
        !self.no_trap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        app: AppConfig,
    }

    fn parse(args: &[&str]) -> AppConfig {
        Harness::parse_from(std::iter::once("pinbar").chain(args.iter().copied())).app
    }

    #[test]
    fn defaults_enable_statistics_and_trapping() {
        let config = parse(&[]);
        assert!(config.show_statistics());
        assert!(config.trap_interrupts());
        assert!(!config.logs);
        assert!(!config.no_logs);
    }

    #[test]
    fn toggles_disable_statistics_and_trapping() {
        let config = parse(&["--no-stats", "--no-trap"]);
        assert!(!config.show_statistics());
        assert!(!config.trap_interrupts());
    }

    #[test]
    fn trace_log_flag_is_parsed_as_path() {
        let config = parse(&["--logs", "--trace-log", "/tmp/bar.jsonl"]);
        assert!(config.logs);
        assert_eq!(config.trace_log, Some(PathBuf::from("/tmp/bar.jsonl")));
    }

    #[test]
    fn default_matches_parsed_flags_without_env() {
        let config = AppConfig::default();
        assert!(config.show_statistics());
        assert!(config.trap_interrupts());
        assert!(config.trace_log.is_none());
    }
}
