//! PhotoUp - concurrent photo uploader
//!
//! CLI entry point for scanning and uploading photos.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use batchpool::{TaskOutcome, TaskScheduler};
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use photoup::bytes::format_bytes;
use photoup::cli::{Cli, Command, OutputFormat, get_log_path};
use photoup::config::Config;
use photoup::scan::{self, ScanResult};
use photoup::store::{DirObjectStore, JsonlRecordStore, LocalTarget};
use photoup::{ItemId, UploadContext, UploadEvent, UploadItem, UploadPipeline};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Scan {
            paths,
            workers,
            fail_fast,
            format,
        } => {
            debug!(?workers, fail_fast, ?format, "main: matched Scan command");
            if let Some(workers) = workers {
                config.scheduler.max_workers = workers;
            }
            if fail_fast {
                config.scheduler.break_on_item_error = true;
            }
            cmd_scan(&config, &paths, format).await
        }
        Command::Upload {
            paths,
            retries,
            workers,
            store_dir,
            records_file,
            owner,
        } => {
            debug!(retries, ?workers, "main: matched Upload command");
            if let Some(workers) = workers {
                config.upload.workers = workers;
            }
            if let Some(dir) = store_dir {
                config.store.dir = dir;
            }
            if let Some(file) = records_file {
                config.store.records_file = file;
            }
            if let Some(owner) = owner {
                config.store.owner = owner;
            }
            cmd_upload(&config, &paths, retries).await
        }
    }
}

/// Inspect files and report which ones can be uploaded
async fn cmd_scan(config: &Config, inputs: &[PathBuf], format: OutputFormat) -> Result<()> {
    debug!(count = inputs.len(), "cmd_scan: called");
    let paths = scan::collect_paths(inputs);

    let (results, aborted) = match scan::scan(paths, &config.scheduler).await {
        Ok(results) => (results, None),
        Err(aborted) => {
            warn!(reason = %aborted.reason, "Scan aborted");
            (aborted.results, Some(aborted.reason))
        }
    };

    match format {
        OutputFormat::Text => print_scan_text(&results),
        OutputFormat::Json => print_scan_json(&results)?,
    }

    if let Some(reason) = aborted {
        eyre::bail!("Scan aborted: {}", reason);
    }
    let failed = results.iter().filter(|r| !r.success()).count();
    if failed > 0 {
        eyre::bail!("{} of {} files cannot be uploaded", failed, results.len());
    }
    Ok(())
}

fn print_scan_text(results: &[ScanResult]) {
    let mut ok_bytes = 0;
    for result in results {
        let path = result.row.display();
        match &result.outcome {
            TaskOutcome::Success(report) => {
                ok_bytes += report.size;
                println!(
                    "{} {} ({}, {})",
                    "ok".green(),
                    path,
                    format_bytes(report.size),
                    report.content_type
                );
            }
            TaskOutcome::Failure(e) => println!("{} {}", "error".red(), e),
            TaskOutcome::Skipped => println!("{} {}", "skipped".yellow(), path),
        }
    }

    let ok = results.iter().filter(|r| r.success()).count();
    println!("{}/{} files ready ({})", ok, results.len(), format_bytes(ok_bytes));
}

fn print_scan_json(results: &[ScanResult]) -> Result<()> {
    let rows: Vec<_> = results
        .iter()
        .map(|result| match &result.outcome {
            TaskOutcome::Success(report) => serde_json::json!({
                "path": result.row,
                "status": "ok",
                "size": report.size,
                "content-type": report.content_type,
            }),
            TaskOutcome::Failure(e) => serde_json::json!({
                "path": result.row,
                "status": "error",
                "error": e.to_string(),
            }),
            TaskOutcome::Skipped => serde_json::json!({
                "path": result.row,
                "status": "skipped",
            }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows).context("Failed to serialize scan results")?);
    Ok(())
}

/// Upload photos through the pipeline, retrying failures
async fn cmd_upload(config: &Config, inputs: &[PathBuf], retries: u32) -> Result<()> {
    debug!(count = inputs.len(), retries, "cmd_upload: called");
    let store = &config.store;
    fs::create_dir_all(&store.dir).context(format!("Failed to create store directory {}", store.dir.display()))?;

    let ctx = UploadContext::new(
        Arc::new(LocalTarget::new(&store.dir, &store.owner)),
        Arc::new(DirObjectStore::new(&store.dir)),
        Arc::new(JsonlRecordStore::new(&store.records_file)),
    );
    let pipeline = UploadPipeline::new(config.upload.clone(), ctx);
    let printer = spawn_event_printer(pipeline.subscribe());

    // Read files concurrently; unreadable ones are reported and left out
    let paths = scan::collect_paths(inputs);
    let loaded = match TaskScheduler::from_config(&config.scheduler).run(paths, scan::load_photo).await {
        Ok(results) => results,
        Err(aborted) => {
            warn!(reason = %aborted.reason, "Loading photos aborted");
            aborted.into_results()
        }
    };

    let mut items = Vec::new();
    for result in loaded {
        match result.outcome {
            TaskOutcome::Success(photo) => items.push(UploadItem::new(photo)),
            TaskOutcome::Failure(e) => println!("{} {}", "skipped".yellow(), e),
            TaskOutcome::Skipped => println!("{} {}", "skipped".yellow(), result.row.display()),
        }
    }

    if items.is_empty() {
        println!("Nothing to upload");
        pipeline.close(true)?;
        finish_printer(printer).await;
        return Ok(());
    }

    println!("Uploading {} photos to {}", items.len(), store.dir.display());
    pipeline.enqueue(items);
    pipeline.wait_idle().await;

    for round in 1..=retries {
        let failed = pipeline.errored();
        if failed.is_empty() {
            break;
        }
        info!(round, count = failed.len(), "Retrying failed uploads");
        println!("Retrying {} failed uploads (round {}/{})", failed.len(), round, retries);
        for view in &failed {
            pipeline.retry(&view.id)?;
        }
        pipeline.wait_idle().await;
    }

    let summary = pipeline.summary();
    println!("{}: {}", summary.header_text().as_str().bold(), summary);

    let failed = pipeline.errored();
    for view in &failed {
        if let Some(remote_id) = &view.remote_id {
            println!("{} {} left remote object {} without a record", "orphaned".red(), view.filename, remote_id);
        }
    }

    pipeline.close(true)?;
    finish_printer(printer).await;

    if !failed.is_empty() {
        eyre::bail!("{} of {} uploads failed", failed.len(), summary.total);
    }
    Ok(())
}

/// Print per-item progress until the pipeline is closed
fn spawn_event_printer(mut rx: broadcast::Receiver<UploadEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut names: HashMap<ItemId, String> = HashMap::new();
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match event {
                UploadEvent::Enqueued { id, filename } => {
                    names.insert(id, filename);
                }
                UploadEvent::Completed { id, remote_id, .. } => {
                    println!("{} {} -> {}", "uploaded".green(), display_name(&names, &id), remote_id);
                }
                UploadEvent::Failed { id, error } => {
                    println!("{} {}: {}", "failed".red(), display_name(&names, &id), error);
                }
                UploadEvent::Closed { .. } => break,
                UploadEvent::StatusChanged { .. } | UploadEvent::Orphaned { .. } | UploadEvent::Removed { .. } => {}
            }
        }
    })
}

fn display_name(names: &HashMap<ItemId, String>, id: &ItemId) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}

async fn finish_printer(printer: JoinHandle<()>) {
    if let Err(e) = printer.await {
        warn!(error = %e, "Event printer task failed");
    }
}
