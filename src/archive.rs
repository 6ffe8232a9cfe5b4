use crate::cli::Naming;
use crate::config::Settings;
use crate::error::ArchiveError;
use crate::types::{ArchivePolicy, ArchiveReport, PodRef};
use crate::utils::{file_age, format_timestamp};
use std::ffi::{OsStr, OsString};
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, info};
use walkdir::WalkDir;

const COMPRESSED_SUFFIX: &str = ".gz";
const PLAIN_SUFFIX: &str = ".log";
const ROTATED_INFIX: &str = ".log.";

#[derive(Debug)]
pub(crate) enum Outcome {
    Ineligible,
    Skipped(PathBuf),
    Copied(PathBuf),
}

/// Whether a file name is an archivable log for the given trigger.
///
/// Compressed (`.gz`) and rotated (`*.log.*`) files always qualify; live
/// `.log` files only when the pod is terminating.
pub fn is_archivable_name(name: &str, policy: ArchivePolicy) -> bool {
    if name.ends_with(COMPRESSED_SUFFIX) || name.contains(ROTATED_INFIX) {
        return true;
    }
    matches!(policy, ArchivePolicy::Event) && name.ends_with(PLAIN_SUFFIX)
}

/// `{backup_root}/{namespace}/{pod}/{timestamp}-{file_name}`
pub fn destination_path(
    backup_root: &Path,
    pod: &PodRef,
    timestamp: &str,
    file_name: &OsStr,
) -> PathBuf {
    let mut name = OsString::from(format!("{}-", timestamp));
    name.push(file_name);
    backup_root.join(&pod.namespace).join(&pod.name).join(name)
}

/// Archive every qualifying file below `dir` into the backup tree.
///
/// Errors on one file never stop the walk; they are logged and collected in
/// the returned report.
pub fn archive_dir(
    dir: &Path,
    pod: &PodRef,
    policy: ArchivePolicy,
    settings: &Settings,
) -> ArchiveReport {
    let mut report = ArchiveReport::default();

    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                let err = ArchiveError::Walk { path, source: err };
                error!("[{}] {}", pod, err);
                report.errors.push(err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let source = entry.path();
        match archive_file(source, entry.file_name(), pod, policy, settings) {
            Ok(Outcome::Ineligible) => {}
            Ok(Outcome::Skipped(dest)) => {
                info!("[{}] Already archived, skipping: {}", pod, dest.display());
                report.skipped += 1;
            }
            Ok(Outcome::Copied(dest)) => {
                info!(
                    "[{}] Archived {} -> {}",
                    pod,
                    source.display(),
                    dest.display()
                );
                report.copied += 1;

                if settings.remove_after_copy {
                    match remove_original(source, pod) {
                        Ok(true) => report.removed += 1,
                        Ok(false) => {}
                        Err(err) => {
                            error!("[{}] {}", pod, err);
                            report.errors.push(err);
                        }
                    }
                }
            }
            Err(err) => {
                error!("[{}] {}", pod, err);
                report.errors.push(err);
            }
        }
    }

    report
}

fn archive_file(
    source: &Path,
    file_name: &OsStr,
    pod: &PodRef,
    policy: ArchivePolicy,
    settings: &Settings,
) -> Result<Outcome, ArchiveError> {
    if !is_archivable_name(&file_name.to_string_lossy(), policy) {
        return Ok(Outcome::Ineligible);
    }

    let meta = match fs::metadata(source) {
        Ok(meta) => meta,
        // rotated or removed since the walk listed it
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Outcome::Ineligible),
        Err(e) => {
            return Err(ArchiveError::Metadata {
                path: source.to_path_buf(),
                source: e,
            });
        }
    };
    let mtime = meta.modified().map_err(|e| ArchiveError::Metadata {
        path: source.to_path_buf(),
        source: e,
    })?;

    if let ArchivePolicy::Sweep { min_age } = policy {
        let stale = file_age(mtime, SystemTime::now()).is_some_and(|age| age > min_age);
        if !stale || meta.len() == 0 {
            debug!(
                "[{}] Not ready for the sweep: {} (size {})",
                pod,
                source.display(),
                meta.len()
            );
            return Ok(Outcome::Ineligible);
        }
    }

    let reader = match File::open(source) {
        Ok(file) => file,
        Err(e) => return unreadable(source, pod, policy, e),
    };

    let timestamp = match settings.naming {
        Naming::WallClock => format_timestamp(SystemTime::now()),
        Naming::SourceMtime => format_timestamp(mtime),
    };
    let dest = destination_path(&settings.backup_root, pod, &timestamp, file_name);
    if dest.exists() {
        return Ok(Outcome::Skipped(dest));
    }

    let dest_dir = dest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.backup_root.clone());
    fs::create_dir_all(&dest_dir).map_err(|e| ArchiveError::CreateDir {
        path: dest_dir.clone(),
        source: e,
    })?;

    if copy_into_place(source, reader, &meta, mtime, &dest_dir, &dest)? {
        Ok(Outcome::Copied(dest))
    } else {
        Ok(Outcome::Skipped(dest))
    }
}

/// A source that cannot be opened is still being written for the sweep, but
/// an error for a terminating pod, whose files are final.
pub(crate) fn unreadable(
    source: &Path,
    pod: &PodRef,
    policy: ArchivePolicy,
    err: io::Error,
) -> Result<Outcome, ArchiveError> {
    match policy {
        ArchivePolicy::Sweep { .. } => {
            debug!("[{}] Not readable yet: {}: {}", pod, source.display(), err);
            Ok(Outcome::Ineligible)
        }
        ArchivePolicy::Event => Err(ArchiveError::Open {
            path: source.to_path_buf(),
            source: err,
        }),
    }
}

/// Delete an archived source. Returns `false` if another trigger already
/// removed it.
pub(crate) fn remove_original(source: &Path, pod: &PodRef) -> Result<bool, ArchiveError> {
    match fs::remove_file(source) {
        Ok(()) => {
            info!("[{}] Removed original: {}", pod, source.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("[{}] Original already removed: {}", pod, source.display());
            Ok(false)
        }
        Err(e) => Err(ArchiveError::Remove {
            path: source.to_path_buf(),
            source: e,
        }),
    }
}

/// Copy `reader` to a temporary file next to `dest`, carry over mode and
/// mtime, then publish it under `dest` without replacing an existing file.
///
/// Returns `false` when another writer published `dest` first.
pub(crate) fn copy_into_place(
    source: &Path,
    mut reader: File,
    meta: &Metadata,
    mtime: SystemTime,
    dest_dir: &Path,
    dest: &Path,
) -> Result<bool, ArchiveError> {
    let copy_err = |e: io::Error| ArchiveError::Copy {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(dest_dir)
        .map_err(copy_err)?;

    io::copy(&mut reader, tmp.as_file_mut()).map_err(copy_err)?;
    tmp.as_file()
        .set_permissions(meta.permissions())
        .map_err(copy_err)?;
    tmp.as_file().set_modified(mtime).map_err(copy_err)?;
    tmp.as_file().sync_all().map_err(copy_err)?;

    match tmp.persist_noclobber(dest) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(ArchiveError::Publish {
            path: dest.to_path_buf(),
            source: e.error,
        }),
    }
}
