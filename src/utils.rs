use chrono::{DateTime, Local};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinSet;
use tracing::error;

/// Timestamp prefix format of archived files.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Translate a single-segment shell glob into an anchored regex.
///
/// `*` matches any run of characters, `?` a single character; everything
/// else is literal.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    let mut literal = String::new();
    for c in glob.chars() {
        match c {
            '*' | '?' => {
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                pattern.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');
    Regex::new(&pattern)
}

/// List the directories directly under `root` whose name matches `re`, sorted.
///
/// A missing `root` yields no matches rather than an error.
pub fn list_matching_dirs(root: &Path, re: &Regex) -> io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    Ok(filter_matching_dirs(
        entries.map(|entry| entry.map(|e| e.path())),
        re,
    ))
}

/// Keep the directories whose file name matches `re`, sorted. Unreadable
/// entries are logged and skipped.
pub fn filter_matching_dirs<I>(entries: I, re: &Regex) -> Vec<PathBuf>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut dirs = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                error!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !re.is_match(name) {
            continue;
        }
        // follows symlinks, like a shell glob would
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    dirs
}

pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Time elapsed since `mtime`, or `None` if it lies in the future.
pub fn file_age(mtime: SystemTime, now: SystemTime) -> Option<Duration> {
    now.duration_since(mtime).ok()
}

/// Wait up to `grace` for every task in `tasks` to finish, then abort the rest.
/// Returns the number of tasks that had to be abandoned.
pub async fn drain_tasks<T: 'static>(tasks: &mut JoinSet<T>, grace: Duration) -> usize {
    let finished = tokio::time::timeout(grace, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if finished.is_ok() {
        return 0;
    }

    let abandoned = tasks.len();
    tasks.abort_all();
    abandoned
}
