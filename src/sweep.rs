use crate::archive::archive_dir;
use crate::config::Settings;
use crate::resolver::{expand_sweep_glob, parse_pod_dir};
use crate::types::{ArchivePolicy, SweepReport};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Sweep the log root every `sweep_interval` until `shutdown` is cancelled.
/// The first pass runs immediately.
pub async fn run_sweep(settings: Arc<Settings>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(settings.sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Periodic sweep started (every {}s, files older than {}s)",
        settings.sweep_interval.as_secs(),
        settings.staleness.as_secs()
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let pass_settings = settings.clone();
        match tokio::task::spawn_blocking(move || sweep_once(&pass_settings)).await {
            Ok(report) => info!(
                "Sweep finished: {} directories, {} copied, {} skipped, {} removed, {} errors",
                report.directories, report.copied, report.skipped, report.removed, report.errors
            ),
            Err(e) => error!("Sweep pass panicked: {}", e),
        }
    }

    info!("Periodic sweep stopped");
}

/// One pass over every directory matching a configured pattern.
pub fn sweep_once(settings: &Settings) -> SweepReport {
    let policy = ArchivePolicy::Sweep {
        min_age: settings.staleness,
    };
    let mut report = SweepReport::default();

    for dir in sweep_candidates(settings) {
        let pod = parse_pod_dir(&dir);
        debug!("[{}] Sweeping {}", pod, dir.display());
        let dir_report = archive_dir(&dir, &pod, policy, settings);
        report.add(&dir_report);
    }

    report
}

/// Pod log directories matched by any pattern, each listed once.
fn sweep_candidates(settings: &Settings) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    for pattern in settings.patterns.patterns() {
        match expand_sweep_glob(&settings.log_root, pattern) {
            Ok(matches) => dirs.extend(matches),
            Err(e) => error!(
                "Failed to expand {}/{}_*: {}",
                settings.log_root.display(),
                pattern,
                e
            ),
        }
    }
    dirs
}
