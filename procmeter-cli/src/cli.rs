//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "procmeter.toml";

/// Procmeter -- proc tracker for game client combat logs.
///
/// Use `procmeter <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "procmeter", version, about, long_about = None)]
pub struct Cli {
    /// Path to the procmeter.toml configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a single log line without cooldown or statistics.
    Classify(ClassifyArgs),

    /// Replay a log file through the tracker and print the resulting statistics.
    Replay(ReplayArgs),

    /// Follow a log file and print every accepted proc as it happens.
    Watch(WatchArgs),

    /// Inspect and validate classification rules.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- display options shared by replay / watch ----

/// Display options applied before any line is processed.
#[derive(Args, Debug, Default)]
pub struct DisplayArgs {
    /// Visibility preset to activate (e.g. All, DamageOnly, ActivationsOnly).
    #[arg(long)]
    pub preset: Option<String>,

    /// Hide a category (repeatable): charm, tier, heal, creature_damage.
    #[arg(long = "hide", value_name = "CATEGORY")]
    pub hide: Vec<String>,
}

// ---- classify ----

/// Classify a single line.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// The raw log line.
    pub line: String,

    /// Only evaluate one category.
    #[arg(long)]
    pub category: Option<String>,
}

// ---- replay ----

/// Replay a log file with a simulated clock.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Log file to replay.
    pub file: PathBuf,

    /// Simulated time between consecutive lines, in milliseconds.
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,

    /// Also print every accepted event in order.
    #[arg(long)]
    pub events: bool,

    #[command(flatten)]
    pub display: DisplayArgs,
}

// ---- watch ----

/// Follow a log file until interrupted.
///
/// Commands typed on stdin while watching: `p` cycles the preset,
/// `t <category>` toggles a category, `r <category>:<name>` resets one key
/// and `r all` resets every key.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Log file to follow.
    pub file: PathBuf,

    /// How often to check the file for new lines, in milliseconds.
    #[arg(long, default_value_t = 250)]
    pub poll_interval_ms: u64,

    /// Process the existing content before following.
    #[arg(long)]
    pub from_beginning: bool,

    #[command(flatten)]
    pub display: DisplayArgs,
}

// ---- rules ----

/// Inspect classification rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List built-in and configured custom rules in priority order.
    List {
        /// Filter by category.
        #[arg(long)]
        category: Option<String>,

        /// Custom rules file to include (default: tracker.rules_file).
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Validate a custom rules YAML file without running it.
    Validate {
        /// YAML rules file.
        path: PathBuf,
    },
}

// ---- config ----

/// Manage procmeter configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tracker, cooldown, display).
        #[arg(long)]
        section: Option<String>,
    },
}
