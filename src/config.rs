use crate::cli::{Cli, Naming};
use crate::matcher::PatternSet;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings, built once at startup and shared read-only by every task.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_root: PathBuf,
    pub backup_root: PathBuf,
    pub patterns: PatternSet,
    pub remove_after_copy: bool,
    pub sweep_interval: Duration,
    pub staleness: Duration,
    pub naming: Naming,
    pub node_name: Option<String>,
    pub shutdown_grace: Duration,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            log_root: cli.log_root.clone(),
            backup_root: cli.backup_root.clone(),
            patterns: PatternSet::new(cli.patterns.iter().cloned()),
            remove_after_copy: cli.remove_after_copy,
            // a zero interval would make tokio's interval panic
            sweep_interval: Duration::from_secs(cli.sweep_interval.max(1)),
            staleness: Duration::from_secs(cli.staleness),
            naming: cli.naming,
            node_name: cli.node_name.clone().filter(|n| !n.is_empty()),
            shutdown_grace: Duration::from_secs(cli.shutdown_grace),
        }
    }
}
