//! CLI argument parsing for Fragua

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for compilation reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "fragua")]
#[command(version)]
#[command(about = "HotSpot LogCompilation analyzer with lifecycle correlation", long_about = None)]
pub struct Cli {
    /// LogCompilation file to analyze (-XX:+LogCompilation output)
    #[arg(value_name = "LOG")]
    pub log: PathBuf,

    /// Filter compilations (e.g., -e method=hashCode or -e kind=osr); repeatable
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    pub filter: Vec<String>,

    /// Show statistics summary (per-compiler counts and timing) instead of individual compilations
    #[arg(short = 'c', long = "summary")]
    pub statistics: bool,

    /// Show elapsed compile time for each compilation
    #[arg(short = 'T', long = "timing")]
    pub timing: bool,

    /// Output format (text, json or csv)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable extended statistics with percentiles and anomaly detection (requires -c)
    #[arg(long = "stats-extended")]
    pub stats_extended: bool,

    /// Anomaly detection threshold in standard deviations (default: 3.0)
    #[arg(
        long = "anomaly-threshold",
        value_name = "SIGMA",
        default_value = "3.0"
    )]
    pub anomaly_threshold: f32,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_cli_parses_log_path() {
        let cli = Cli::parse_from(["fragua", "compilation.log"]);
        assert_eq!(cli.log, Path::new("compilation.log"));
        assert!(!cli.statistics);
        assert!(!cli.timing);
        assert!(cli.filter.is_empty());
    }

    #[test]
    fn test_cli_requires_log_path() {
        let result = Cli::try_parse_from(["fragua"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_summary_flag() {
        let cli = Cli::parse_from(["fragua", "-c", "compilation.log"]);
        assert!(cli.statistics);
    }

    #[test]
    fn test_cli_timing_flag() {
        let cli = Cli::parse_from(["fragua", "-T", "compilation.log"]);
        assert!(cli.timing);
    }

    #[test]
    fn test_cli_filter_exprs_accumulate() {
        let cli = Cli::parse_from([
            "fragua",
            "-e",
            "compiler=C2",
            "-e",
            "level=4",
            "compilation.log",
        ]);
        assert_eq!(cli.filter, vec!["compiler=C2", "level=4"]);
    }

    #[test]
    fn test_cli_format_values() {
        let cli = Cli::parse_from(["fragua", "--format", "json", "compilation.log"]);
        assert!(matches!(cli.format, OutputFormat::Json));

        let cli = Cli::parse_from(["fragua", "--format", "csv", "compilation.log"]);
        assert!(matches!(cli.format, OutputFormat::Csv));

        let cli = Cli::parse_from(["fragua", "compilation.log"]);
        assert!(matches!(cli.format, OutputFormat::Text));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        let result = Cli::try_parse_from(["fragua", "--format", "xml", "compilation.log"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_stats_extended_flag() {
        let cli = Cli::parse_from(["fragua", "-c", "--stats-extended", "compilation.log"]);
        assert!(cli.statistics);
        assert!(cli.stats_extended);
    }

    #[test]
    fn test_cli_anomaly_threshold_default() {
        let cli = Cli::parse_from(["fragua", "compilation.log"]);
        assert_eq!(cli.anomaly_threshold, 3.0);
    }

    #[test]
    fn test_cli_anomaly_threshold_custom() {
        let cli = Cli::parse_from([
            "fragua",
            "--anomaly-threshold",
            "2.5",
            "compilation.log",
        ]);
        assert_eq!(cli.anomaly_threshold, 2.5);
    }

    #[test]
    fn test_cli_debug_default_false() {
        let cli = Cli::parse_from(["fragua", "compilation.log"]);
        assert!(!cli.debug);
    }
}
