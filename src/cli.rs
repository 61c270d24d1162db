//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and environment fallbacks.

use clap::Parser;
use std::path::PathBuf;

/// CERTA Painel - outreach dashboard for the CERTA program
///
/// Serves the public dashboard, the CSV downloads and the admin panel
/// backed by two CSV files in the data directory.
///
/// Examples:
///   certa-painel
///   certa-painel --port 8080 --data-dir /var/lib/certa
///   certa-painel --report resumo.md
///   certa-painel --report resumo.json --format json
///   certa-painel --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Address to bind the HTTP server to
    #[arg(long, value_name = "ADDR", env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,

    /// Directory holding dados.csv and demografia.csv
    ///
    /// Defaults to the current working directory.
    #[arg(long, value_name = "DIR", env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory with the bundled default files used for first-run seeding
    #[arg(long, value_name = "DIR", env = "SEED_DIR")]
    pub seed_dir: Option<PathBuf>,

    /// Admin username
    #[arg(long, value_name = "USER", env = "ADMIN_USER")]
    pub admin_user: Option<String>,

    /// Admin password
    #[arg(long, value_name = "PASS", env = "ADMIN_PASS", hide_env_values = true)]
    pub admin_pass: Option<String>,

    /// Secret used to sign the admin session cookie
    #[arg(long, value_name = "SECRET", env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .certa.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Write a dashboard summary to FILE and exit instead of serving
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Generate a default .certa.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the offline report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if let Some(ref user) = self.admin_user {
            if user.trim().is_empty() {
                return Err("Admin username cannot be empty".to_string());
            }
        }

        if let Some(ref seed_dir) = self.seed_dir {
            if seed_dir.exists() && !seed_dir.is_dir() {
                return Err(format!(
                    "Seed path is not a directory: {}",
                    seed_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            host: None,
            port: None,
            data_dir: None,
            seed_dir: None,
            admin_user: None,
            admin_pass: None,
            secret_key: None,
            config: None,
            verbose: false,
            quiet: false,
            report: None,
            format: OutputFormat::Markdown,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_accepts_defaults() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_port_zero_and_blank_user() {
        let mut args = make_args();
        args.port = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.admin_user = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "certa-painel",
            "--port",
            "8080",
            "--data-dir",
            "/tmp/certa",
            "--report",
            "out.json",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.port, Some(8080));
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/certa")));
        assert_eq!(args.format, OutputFormat::Json);
    }
}
