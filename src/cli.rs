use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// How the timestamp prefix of an archived file name is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Naming {
    /// Time of the copy. Each trigger that copies a file produces its own backup.
    WallClock,
    /// Modification time of the source. The same unchanged file always maps to one backup.
    SourceMtime,
}

#[derive(Parser, Debug)]
#[command(name = "podlog-keeper", version)]
#[command(about = "Archive pod log files from the node before the container runtime removes them")]
pub struct Cli {
    /// Comma-separated namespace patterns (trailing '*' is a prefix match, '*' alone matches all)
    #[arg(
        short,
        long,
        env = "BACKUP_PATTERN",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub patterns: Vec<String>,

    /// Remove source files once they have been copied
    #[arg(
        long,
        env = "REMOVE_AFTER_COPY",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub remove_after_copy: bool,

    /// Directory holding the per-pod log directories
    #[arg(long, env = "LOG_BASE", default_value = "/var/log/pods")]
    pub log_root: PathBuf,

    /// Directory the archived files are written to
    #[arg(long, env = "BACKUP_PATH", default_value = "/backup")]
    pub backup_root: PathBuf,

    /// Seconds between two filesystem sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval: u64,

    /// Minimum age in seconds of a file before the sweep archives it
    #[arg(long, env = "STALENESS_SECS", default_value_t = 60)]
    pub staleness: u64,

    /// Timestamp used as the archived file name prefix
    #[arg(long, env = "BACKUP_NAMING", value_enum, default_value_t = Naming::WallClock)]
    pub naming: Naming,

    /// Only react to pods scheduled on this node
    #[arg(long, env = "NODE_NAME")]
    pub node_name: Option<String>,

    /// Seconds to wait for in-flight archival tasks on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace: u64,

    /// Run the periodic sweep only, without watching the cluster
    #[arg(
        long,
        env = "DISABLE_WATCH",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub no_watch: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
