//! # CLI Module
//!
//! Command-line interface for the line deduplication filter.
//!
//! ## Usage
//! ```bash
//! # Drop every repeated line, forever
//! tail -f events.log | line-dedup
//!
//! # Let a line through again once it has been quiet for 5 minutes
//! tail -f events.log | line-dedup --period 5m
//!
//! # Reclaim stale fingerprints every minute and print a summary at the end
//! line-dedup --period 1h --sweep-interval 1m --stats pretty < input.jsonl
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use line_dedup::core::cache::{CacheStats, ExpiringCache, Retention};
use line_dedup::core::config::DedupConfig;
use line_dedup::core::pipeline::{Pipeline, PipelineResult};
use line_dedup::error::{PipelineError, Result};
use line_dedup::events::{
    null_sender, CacheEvent, Event, EventChannel, EventReceiver, PipelineEvent,
};
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Line Dedup - pass each distinct line through once
#[derive(Parser, Debug)]
#[command(name = "line-dedup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Deduplication period (e.g. '10s', '5m', '1h'). If not set, deduplication is permanent
    #[arg(short, long, allow_hyphen_values = true)]
    period: Option<String>,

    /// How often stale fingerprints are reclaimed (defaults to the period)
    #[arg(long, allow_hyphen_values = true)]
    sweep_interval: Option<String>,

    /// Print a run summary to stderr once input is drained
    #[arg(long)]
    stats: Option<StatsFormat>,

    /// Show a live progress spinner on stderr
    #[arg(long)]
    progress: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatsFormat {
    /// Human-readable summary with colors
    Pretty,
    /// JSON summary for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    line_dedup::init_tracing(cli.verbose);

    let stdin = io::stdin();
    let stdout = io::stdout();
    execute(&cli, stdin.lock(), stdout.lock())
}

fn execute<R: BufRead, W: Write>(cli: &Cli, input: R, output: W) -> Result<()> {
    // Nothing is read until the configuration is known to be good
    let config = DedupConfig::from_args(cli.period.as_deref(), cli.sweep_interval.as_deref())?;
    let retention = config.retention();

    info!(period = %retention, "Starting deduplication service");
    if config.sweep_interval.is_some() && retention == Retention::Permanent {
        warn!("--sweep-interval has no effect without a period");
    }

    let (sender, display) = if cli.progress {
        let (sender, receiver) = EventChannel::new();
        (sender, Some(spawn_progress(receiver)))
    } else {
        (null_sender(), None)
    };

    let mut cache_builder = ExpiringCache::builder(retention).events(sender.clone());
    if let Some(interval) = config.effective_sweep_interval() {
        cache_builder = cache_builder.sweep_interval(interval);
    }
    let pipeline = Pipeline::builder()
        .store(Box::new(cache_builder.build()))
        .build();

    let outcome = pipeline.run_with_events(input, output, &sender);
    pipeline.shutdown();
    let cache_stats = pipeline.store().stats();

    // The display thread ends once every sender, the cache's included, is gone
    drop(pipeline);
    drop(sender);
    if let Some(handle) = display {
        handle.join().ok();
    }

    let result = match outcome {
        Ok(result) => result,
        Err(PipelineError::Write { source }) if source.kind() == io::ErrorKind::BrokenPipe => {
            info!("Output closed by reader; stopping");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match cli.stats {
        Some(StatsFormat::Pretty) => {
            print_pretty_stats(&Term::stderr(), &result, &cache_stats, retention)
        }
        Some(StatsFormat::Json) => {
            print_json_stats(&Term::stderr(), &result, &cache_stats, retention)
        }
        None => {}
    }

    info!("Deduplication service finished.");
    Ok(())
}

fn spawn_progress(receiver: EventReceiver) -> thread::JoinHandle<()> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Reading input...");

    thread::spawn(move || {
        let mut held = 0;
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::Progress(p)) => {
                    spinner.set_message(format!(
                        "{} read, {} written, {} duplicates, {} held",
                        p.records_read, p.records_written, p.duplicates_dropped, held
                    ));
                }
                Event::Cache(CacheEvent::Reclaimed { remaining, .. }) => {
                    held = remaining;
                }
                Event::Pipeline(PipelineEvent::ReadError { message }) => {
                    spinner.println(format!("{} {}", style("!").red().bold(), message));
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    spinner.finish_and_clear();
                }
                _ => {}
            }
        }
        spinner.finish_and_clear();
    })
}

fn print_pretty_stats(
    term: &Term,
    result: &PipelineResult,
    cache: &CacheStats,
    retention: Retention,
) {
    term.write_line("").ok();
    let heading = if result.completed() {
        format!("{} Deduplication complete", style("✓").green().bold())
    } else {
        format!("{} Input ended early", style("!").yellow().bold())
    };
    term.write_line(&heading).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} records read in {:.1}s",
        style(result.records_read).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} records written",
        style(result.records_written).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicates dropped",
        style(result.duplicates_dropped).yellow()
    ))
    .ok();

    if result.empty_skipped > 0 {
        term.write_line(&format!(
            "  {} empty lines skipped",
            style(result.empty_skipped).dim()
        ))
        .ok();
    }

    term.write_line(&format!(
        "  {} fingerprints held ({})",
        style(cache.entries).cyan(),
        style(retention).dim()
    ))
    .ok();

    if cache.reclaimed > 0 {
        term.write_line(&format!(
            "  {} stale fingerprints reclaimed",
            style(cache.reclaimed).dim()
        ))
        .ok();
    }

    if let Some(error) = &result.read_error {
        term.write_line(&format!(
            "  {} {}",
            style("Read error:").red(),
            error
        ))
        .ok();
    }
}

fn print_json_stats(
    term: &Term,
    result: &PipelineResult,
    cache: &CacheStats,
    retention: Retention,
) {
    let output = serde_json::json!({
        "retention": retention.to_string(),
        "period_ms": retention.period().map(|p| p.as_millis() as u64).unwrap_or(0),
        "records_read": result.records_read,
        "records_written": result.records_written,
        "duplicates_dropped": result.duplicates_dropped,
        "empty_skipped": result.empty_skipped,
        "read_error": result.read_error,
        "duration_ms": result.duration_ms,
        "cache": cache,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => {
            term.write_line(&json).ok();
        }
        Err(e) => warn!(error = %e, "Failed to serialize run summary"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use line_dedup::error::{ConfigError, LineDedupError};
    use std::io::{BufReader, Cursor, Read};

    struct NeverRead;

    impl Read for NeverRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("input must not be read when the configuration is invalid");
        }
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["line-dedup"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_period_fails_before_reading() {
        let cli = parse(&["--period", "-1s"]);
        let mut output = Vec::new();

        let error = execute(&cli, BufReader::new(NeverRead), &mut output).unwrap_err();

        assert!(matches!(
            error,
            LineDedupError::Config(ConfigError::NegativePeriod { .. })
        ));
        assert!(output.is_empty());
    }

    #[test]
    fn invalid_sweep_interval_fails_before_reading() {
        let cli = parse(&["--period", "1m", "--sweep-interval", "0s"]);
        let error = execute(&cli, BufReader::new(NeverRead), io::sink()).unwrap_err();

        assert!(matches!(
            error,
            LineDedupError::Config(ConfigError::InvalidSweepInterval { .. })
        ));
    }

    #[test]
    fn default_run_is_permanent() {
        let cli = parse(&[]);
        let mut output = Vec::new();

        execute(&cli, Cursor::new("a\nb\na\nc\nb\n"), &mut output).unwrap();

        assert_eq!(output, b"a\nb\nc\n");
    }

    #[test]
    fn timed_run_with_stats_and_progress() {
        let cli = parse(&["-p", "1h", "--stats", "json", "--progress"]);
        let mut output = Vec::new();

        execute(&cli, Cursor::new("x\n\nx\ny\n"), &mut output).unwrap();

        assert_eq!(output, b"x\ny\n");
    }

    #[test]
    fn broken_pipe_ends_quietly() {
        let cli = parse(&[]);
        assert!(execute(&cli, Cursor::new("a\n"), ClosedPipe).is_ok());
    }
}
