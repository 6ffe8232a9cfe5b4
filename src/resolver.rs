use crate::types::PodRef;
use crate::utils::{glob_to_regex, list_matching_dirs};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};

/// Directories under `log_root` holding logs of `pod`, i.e. `{namespace}_{pod}_*`.
///
/// An empty result is normal: the pod may never have run on this node.
pub fn resolve_pod_dirs(log_root: &Path, pod: &PodRef) -> io::Result<Vec<PathBuf>> {
    let pattern = format!(
        "^{}_{}_.*$",
        regex::escape(&pod.namespace),
        regex::escape(&pod.name)
    );
    let re = Regex::new(&pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    list_matching_dirs(log_root, &re)
}

/// Directories under `log_root` matching the sweep glob `{pattern}_*`.
pub fn expand_sweep_glob(log_root: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    let re = glob_to_regex(&format!("{}_*", pattern))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    list_matching_dirs(log_root, &re)
}

/// Recover the pod a log directory belongs to from its `{namespace}_{pod}_{suffix}` name.
pub fn parse_pod_dir(dir: &Path) -> PodRef {
    let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
        return PodRef::unknown();
    };

    let mut parts = name.split('_');
    match (parts.next(), parts.next()) {
        (Some(namespace), Some(pod)) if is_plain_segment(namespace) && is_plain_segment(pod) => {
            PodRef::new(namespace, pod)
        }
        _ => PodRef::unknown(),
    }
}

/// Tokens become backup path components, so they must not walk out of the
/// backup root.
fn is_plain_segment(token: &str) -> bool {
    !token.is_empty() && token != "." && token != ".." && !token.contains(&['/', '\\'][..])
}
