//! `procmeter watch` command handler

use std::io::{BufRead, Write};
use std::time::SystemTime;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use procmeter_core::config::ProcmeterConfig;
use procmeter_core::types::{Category, EventKey};
use procmeter_engine::{
    DisplayAdapter, DisplayState, FileTailCollector, FileTailConfig, ProcSnapshot,
    TrackerCommand, TrackerStats,
};

use crate::cli::{OutputFormat, WatchArgs};
use crate::commands::{build_tracker, parse_category};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, category_label};

/// Capacity of the collector -> tracker line channel.
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the stdin -> tracker command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Usage shown when watching starts and when a command doesn't parse.
const COMMAND_USAGE: &str = "p | t <category> | r <category>:<name> | r all";

/// Execute the `watch` command.
///
/// The collector runs on its own task and feeds the tracker over a channel.
/// Operator commands typed on stdin reach the tracker over a second channel.
/// Ctrl-C stops the collector, which closes the channel and ends the tracker loop.
pub async fn execute(
    args: WatchArgs,
    config: &ProcmeterConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut tracker = build_tracker(config, &args.display).await?;
    tracker.add_adapter(Box::new(ConsoleAdapter::new(writer.format())));

    let mut tail_config = FileTailConfig::new(&args.file);
    tail_config.poll_interval_ms = args.poll_interval_ms;
    tail_config.from_beginning = args.from_beginning;

    let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut collector = FileTailCollector::new(tail_config, line_tx);
    let collector_task = tokio::spawn(async move { collector.run(shutdown_rx).await });

    let signal_task = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("interrupt received, stopping");
        let _ = shutdown_tx.send(true);
    });

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    spawn_command_reader(command_tx);

    info!(path = %args.file.display(), commands = COMMAND_USAGE, "watching log file");
    let processed = tracker.run_with_commands(line_rx, command_rx).await;
    signal_task.abort();

    collector_task
        .await
        .map_err(|e| CliError::Command(format!("collector task failed: {e}")))??;

    let report = WatchSummary {
        file: args.file.display().to_string(),
        lines: processed,
        stats: tracker.tracker_stats(),
        records: tracker.snapshots(SystemTime::now()),
    };
    writer.render(&report)?;
    Ok(())
}

/// Parse one operator command.
///
/// - `p` cycles the visibility preset
/// - `t <category>` toggles a category
/// - `r <category>:<name>` resets one key, `r all` resets every key
pub fn parse_command(input: &str) -> Result<TrackerCommand, CliError> {
    let input = input.trim();
    let (verb, rest) = match input.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (input, ""),
    };

    match (verb, rest) {
        ("p", "") => Ok(TrackerCommand::CyclePreset),
        ("t", category) if !category.is_empty() => {
            Ok(TrackerCommand::ToggleCategory(parse_category(category)?))
        }
        ("r", "all") => Ok(TrackerCommand::ResetAll),
        ("r", key) => {
            let Some((category, name)) = key.split_once(':') else {
                return Err(CliError::Command(format!(
                    "reset needs <category>:<name>, got '{key}'"
                )));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(CliError::Command("reset needs a key name".to_owned()));
            }
            Ok(TrackerCommand::Reset(EventKey::new(
                parse_category(category.trim())?,
                name,
            )))
        }
        _ => Err(CliError::Command(format!(
            "unknown command '{input}' (expected: {COMMAND_USAGE})"
        ))),
    }
}

/// Forward commands read from `input` until EOF or until the tracker stops listening.
///
/// Returns the number of commands sent. Lines that don't parse are logged and skipped.
pub fn read_commands<R: BufRead>(input: R, tx: &mpsc::Sender<TrackerCommand>) -> usize {
    let mut sent = 0;
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to read command input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(command) => {
                debug!(command = ?command, "operator command");
                if tx.blocking_send(command).is_err() {
                    debug!("tracker stopped, command reader exiting");
                    break;
                }
                sent += 1;
            }
            Err(e) => warn!(input = %line.trim(), error = %e, "ignoring operator command"),
        }
    }
    sent
}

/// Read stdin on a plain thread; a blocked read never holds up runtime shutdown.
fn spawn_command_reader(tx: mpsc::Sender<TrackerCommand>) {
    std::thread::spawn(move || {
        let sent = read_commands(std::io::stdin().lock(), &tx);
        debug!(sent, "command input closed");
    });
}

/// Prints every accepted proc as soon as the tracker reports it.
pub struct ConsoleAdapter {
    format: OutputFormat,
    out: Box<dyn Write + Send>,
}

impl ConsoleAdapter {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, Box::new(std::io::stdout()))
    }

    pub fn with_writer(format: OutputFormat, out: Box<dyn Write + Send>) -> Self {
        Self { format, out }
    }

    fn emit(&mut self, snapshot: &ProcSnapshot) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, snapshot)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => {
                if let Some(line) = snapshot.render_line() {
                    writeln!(self.out, "{} {}", category_label(snapshot.key.category), line)?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Status lines are for people; JSON output carries only snapshots.
    fn emit_notice(&mut self, notice: &str) -> Result<(), CliError> {
        if self.format == OutputFormat::Text {
            writeln!(self.out, "{notice}")?;
            self.out.flush()?;
        }
        Ok(())
    }
}

impl DisplayAdapter for ConsoleAdapter {
    fn on_snapshot(&mut self, snapshot: &ProcSnapshot) {
        if let Err(e) = self.emit(snapshot) {
            warn!(key = %snapshot.key, error = %e, "failed to print snapshot");
        }
    }

    fn on_reset(&mut self, key: &EventKey) {
        let notice = format!("{} {} reset", category_label(key.category), key.name);
        if let Err(e) = self.emit_notice(&notice) {
            warn!(key = %key, error = %e, "failed to print reset");
        }
    }

    fn on_display_change(&mut self, state: &DisplayState) {
        let hidden: Vec<&str> = Category::ALL
            .iter()
            .filter(|c| !state.is_category_visible(**c))
            .map(|c| c.as_str())
            .collect();
        let notice = if hidden.is_empty() {
            format!("preset {}", state.active_preset().name)
        } else {
            format!(
                "preset {} (hidden: {})",
                state.active_preset().name,
                hidden.join(", ")
            )
        };
        if let Err(e) = self.emit_notice(&notice) {
            warn!(error = %e, "failed to print display change");
        }
    }
}

/// Final statistics printed when watching stops.
#[derive(Serialize)]
pub struct WatchSummary {
    pub file: String,
    pub lines: u64,
    pub stats: TrackerStats,
    pub records: Vec<ProcSnapshot>,
}

impl Render for WatchSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w)?;
        writeln!(
            w,
            "Stopped watching {} ({} lines, {} accepted, {} suppressed)",
            self.file.bold(),
            self.lines,
            self.stats.events_accepted,
            self.stats.events_suppressed
        )?;
        for snapshot in &self.records {
            if let Some(line) = snapshot.render_line() {
                writeln!(w, "  {} {}", category_label(snapshot.key.category), line)?;
            }
        }
        Ok(())
    }
}
