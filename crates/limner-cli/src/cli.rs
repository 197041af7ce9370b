use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "limn")]
#[command(about = "limn - illustrate markdown notes with generated images, reversibly")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault root; relative note paths and attachment folders resolve against it
    #[arg(long, global = true, env = "LIMNER_VAULT", default_value = ".")]
    pub vault: PathBuf,

    /// Config file path (defaults to ~/.config/limner/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan, generate and insert images into a note
    Generate {
        /// Note path
        note: PathBuf,
    },

    /// Remove the most recently inserted batch of images
    Undo {
        /// Note path
        note: PathBuf,
    },

    /// Remove every generated image block from a note
    Clear {
        /// Note path
        note: PathBuf,

        /// Skip the confirmation and remove immediately
        #[arg(short, long)]
        yes: bool,
    },

    /// Regenerate the image block around a line
    Regenerate {
        /// Note path
        note: PathBuf,

        /// Line inside the block (1-based, as shown by editors)
        #[arg(long)]
        line: usize,
    },

    /// Show the note's sections and existing image blocks
    Sections {
        /// Note path
        note: PathBuf,

        /// Only print the line of this exact heading (e.g. "## Setup")
        #[arg(long)]
        heading: Option<String>,
    },

    /// Show the latest pre-generation backup of a note
    Backup {
        /// Note path
        note: PathBuf,

        /// Print the backed-up note content
        #[arg(long)]
        content: bool,
    },
}
