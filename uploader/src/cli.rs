//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// PhotoUp - concurrent photo uploader
#[derive(Parser)]
#[command(
    name = "photoup",
    about = "Check and upload photos with a bounded pool of workers",
    version,
    after_help = "Logs are written to: ~/.local/share/photoup/logs/photoup.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect files before uploading (exists, non-empty, supported type)
    Scan {
        /// Files or directories to inspect
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Maximum concurrent inspections
        #[arg(short, long)]
        workers: Option<usize>,

        /// Stop at the first bad file
        #[arg(long)]
        fail_fast: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Upload photos to the configured store
    Upload {
        /// Files or directories to upload
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Retry rounds for failed uploads
        #[arg(short, long, default_value = "0")]
        retries: u32,

        /// Concurrent upload workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory to store objects in (overrides config)
        #[arg(long, value_name = "DIR")]
        store_dir: Option<PathBuf>,

        /// Metadata records file (overrides config)
        #[arg(long, value_name = "FILE")]
        records_file: Option<PathBuf>,

        /// Owner recorded with every object (overrides config)
        #[arg(long)]
        owner: Option<String>,
    },
}

/// Output format for scan results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photoup")
        .join("logs")
        .join("photoup.log");
    debug!(?path, "get_log_path: returning path");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("PLAIN".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_scan_args() {
        let cli = Cli::try_parse_from(["photoup", "scan", "a.jpg", "pics", "--workers", "3", "--fail-fast"]).unwrap();
        match cli.command {
            Command::Scan {
                paths,
                workers,
                fail_fast,
                format,
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.jpg"), PathBuf::from("pics")]);
                assert_eq!(workers, Some(3));
                assert!(fail_fast);
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_upload_args_with_globals() {
        let cli = Cli::try_parse_from([
            "photoup",
            "upload",
            "pics",
            "--retries",
            "2",
            "--owner",
            "sam",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Upload { retries, owner, .. } => {
                assert_eq!(retries, 2);
                assert_eq!(owner.as_deref(), Some("sam"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_paths_required() {
        assert!(Cli::try_parse_from(["photoup", "upload"]).is_err());
    }

    #[test]
    fn test_log_path_under_photoup() {
        assert!(get_log_path().ends_with("photoup/logs/photoup.log"));
    }
}
