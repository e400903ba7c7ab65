//! Clap derive structures for the `poolmath` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use poolmath_core::TemperatureUnit;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// poolmath -- poll Pool Math chemistry logs from the command line
#[derive(Debug, Parser)]
#[command(
    name = "poolmath",
    version,
    about = "Poll Pool Math pool chemistry logs",
    long_about = "Reads the chemistry log a Pool Math pool shares publicly and\n\
        exposes each measurement (FC, CC, pH, TA, ...) as a sensor value.\n\n\
        Pools are configured by share link in the config file, or passed\n\
        directly with --url.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "POOLMATH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for persisted sensor state
    #[arg(long, env = "POOLMATH_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Pool Math API root
    #[arg(long, env = "POOLMATH_BASE_URL", global = true, hide = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "POOLMATH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "POOLMATH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitArg {
    /// Fahrenheit, as Pool Math logs it
    F,
    /// Celsius
    C,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::F => Self::Fahrenheit,
            UnitArg::C => Self::Celsius,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List configured pools
    #[command(alias = "ls")]
    Pools,

    /// Resolve a share link to its user and pool ids
    Resolve(ResolveArgs),

    /// Fetch the latest chemistry once
    #[command(alias = "get")]
    Fetch(FetchArgs),

    /// Poll continuously and print each update
    Watch(WatchArgs),

    /// Rewrite legacy share ids in the config as user/pool ids
    Migrate(MigrateArgs),

    /// Print a redacted health report
    #[command(alias = "diag")]
    Diagnostics(FetchArgs),

    /// Manage the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Pool selection ───────────────────────────────────────────────────

/// Which pools a command works on.
#[derive(Debug, Args)]
pub struct PoolSelector {
    /// Pool key from the config (all pools when omitted)
    pub pool: Option<String>,

    /// Use a share link instead of the config
    #[arg(long, short = 'u', conflicts_with = "pool")]
    pub url: Option<String>,

    /// Display name for --url
    #[arg(long, requires = "url")]
    pub name: Option<String>,

    /// Temperature unit (overrides config)
    #[arg(long, value_enum)]
    pub unit: Option<UnitArg>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Share link, e.g. https://troublefreepool.com/mypool/6WPG8yL
    pub url: String,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub pools: PoolSelector,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub pools: PoolSelector,

    /// Poll interval, e.g. "10m" (minimum 60s)
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Exit after printing this many updates
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Pool key to migrate (all legacy pools when omitted)
    pub pool: Option<String>,

    /// Show what would change without writing the config
    #[arg(long)]
    pub dry_run: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective config
    Show,

    /// Add a pool by share link
    Add {
        /// Key for the new pool, e.g. "backyard"
        key: String,

        /// Share link
        url: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Poll interval, e.g. "10m"
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,

        /// Temperature unit
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,
    },

    /// Remove a pool
    #[command(alias = "rm")]
    Remove {
        /// Key of the pool to remove
        key: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
