//! `procmeter replay` command handler

use std::io::Write;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::info;

use procmeter_core::config::ProcmeterConfig;
use procmeter_engine::collector::read_all_lines;
use procmeter_engine::{ProcSnapshot, ProcTracker, TrackerStats};

use crate::cli::ReplayArgs;
use crate::commands::build_tracker;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, category_label};

/// Execute the `replay` command.
pub async fn execute(
    args: ReplayArgs,
    config: &ProcmeterConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut tracker = build_tracker(config, &args.display).await?;

    let lines = read_all_lines(&args.file).await?;
    info!(path = %args.file.display(), lines = lines.len(), "replaying log file");

    let mut report = replay_lines(
        &mut tracker,
        &lines,
        SystemTime::now(),
        Duration::from_millis(args.interval_ms),
        args.events,
    );
    report.file = args.file.display().to_string();

    info!(
        accepted = report.stats.events_accepted,
        suppressed = report.stats.events_suppressed,
        "replay finished"
    );
    writer.render(&report)?;
    Ok(())
}

/// Feed lines through the tracker with a simulated clock.
///
/// Line `i` is processed at `start + i * interval`; the final statistics
/// are captured at the time of the last line.
pub fn replay_lines(
    tracker: &mut ProcTracker,
    lines: &[String],
    start: SystemTime,
    interval: Duration,
    keep_events: bool,
) -> ReplayReport {
    let mut now = start;
    let mut events = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            now = now.checked_add(interval).unwrap_or(now);
        }
        let snapshots = tracker.process_line_at(line, now);
        if keep_events {
            events.extend(snapshots);
        }
    }

    ReplayReport {
        file: String::new(),
        preset: tracker.display().active_preset().name.clone(),
        stats: tracker.tracker_stats(),
        events,
        records: tracker.snapshots(now),
    }
}

/// Replay outcome.
#[derive(Serialize)]
pub struct ReplayReport {
    pub file: String,
    pub preset: String,
    pub stats: TrackerStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<ProcSnapshot>,
    pub records: Vec<ProcSnapshot>,
}

impl Render for ReplayReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Replay: {}", self.file.bold())?;
        writeln!(
            w,
            "  Lines: {}, classified: {}, accepted: {}, suppressed: {}",
            self.stats.lines_processed,
            self.stats.events_classified,
            self.stats.events_accepted.to_string().green(),
            self.stats.events_suppressed.to_string().yellow()
        )?;

        if !self.events.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Events".bold())?;
            for snapshot in &self.events {
                if let Some(line) = snapshot.render_line() {
                    writeln!(w, "  {} {}", category_label(snapshot.key.category), line)?;
                }
            }
        }

        writeln!(w)?;
        writeln!(w, "{} (preset: {})", "Statistics".bold(), self.preset)?;
        let visible: Vec<_> = self
            .records
            .iter()
            .filter_map(|snapshot| snapshot.render_line().map(|line| (snapshot, line)))
            .collect();
        if visible.is_empty() {
            writeln!(w, "  {}", "no procs recorded".dimmed())?;
        }
        for (snapshot, line) in visible {
            writeln!(w, "  {} {}", category_label(snapshot.key.category), line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use procmeter_core::types::Category;
    use procmeter_engine::TrackerBuilder;

    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    fn start() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)
    }

    #[test]
    fn test_replay_debounces_charm_burst() {
        let mut tracker = TrackerBuilder::new().build().expect("tracker");
        let report = replay_lines(
            &mut tracker,
            &lines(&[
                "You deal 150 damage. (low blow charm)",
                "You deal 150 damage. (low blow charm)",
                "You deal 400 hitpoints. (freeze charm)",
            ]),
            start(),
            Duration::from_millis(100),
            true,
        );

        assert_eq!(report.stats.lines_processed, 3);
        assert_eq!(report.stats.events_accepted, 2);
        assert_eq!(report.events.len(), 2);

        let names: Vec<_> = report.records.iter().map(|s| s.key.name.as_str()).collect();
        assert_eq!(names, vec!["Freeze", "Low Blow"]);
        assert!(report.records.iter().all(|s| s.record.count == 1));
    }

    #[test]
    fn test_replay_without_events_keeps_records_only() {
        let mut tracker = TrackerBuilder::new().build().expect("tracker");
        let report = replay_lines(
            &mut tracker,
            &lines(&["A dragon hits you for 75 hitpoints"]),
            start(),
            Duration::from_millis(100),
            false,
        );
        assert!(report.events.is_empty());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].key.category, Category::CreatureDamage);

        let json = serde_json::to_value(&report).expect("serialize");
        assert!(json.get("events").is_none());
        assert_eq!(json["stats"]["events_accepted"], 1);
    }

    #[test]
    fn test_replay_report_render_text() {
        let mut tracker = TrackerBuilder::new().build().expect("tracker");
        let mut report = replay_lines(
            &mut tracker,
            &lines(&["You heal Test Player for 563 hitpoints"]),
            start(),
            Duration::from_millis(100),
            false,
        );
        report.file = "game.log".to_owned();

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("game.log"));
        assert!(output.contains("To_Test Player"));
        assert!(output.contains("preset: All"));
    }

    #[test]
    fn test_replay_empty_file_renders_placeholder() {
        let mut tracker = TrackerBuilder::new().build().expect("tracker");
        let report = replay_lines(&mut tracker, &[], start(), Duration::from_millis(100), false);
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("no procs recorded"));
    }
}
