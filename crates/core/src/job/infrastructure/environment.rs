use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::shared::constants::{CA_BUNDLE_CANDIDATES, EXTRA_PATH_DIRS};

/// Re-apply process-level configuration a freshly started worker may lack.
///
/// Processes launched from a desktop session often start with a minimal
/// PATH and no trust-store hint, so both are set up here. Must run before the
/// worker spawns any thread. Safe to call twice.
pub fn prepare_environment() {
    let current = env::var_os("PATH").unwrap_or_default();
    if let Some(path) = augmented_path(&current, EXTRA_PATH_DIRS) {
        env::set_var("PATH", path);
    }
    configure_trust_store();
}

/// `current` with every missing `extra` directory appended, or `None` when
/// nothing needs to change.
pub fn augmented_path(current: &OsStr, extra: &[&str]) -> Option<OsString> {
    let mut entries: Vec<PathBuf> = env::split_paths(current)
        .filter(|entry| !entry.as_os_str().is_empty())
        .collect();
    let before = entries.len();
    for dir in extra {
        let dir = Path::new(dir);
        if !entries.iter().any(|entry| entry == dir) {
            entries.push(dir.to_path_buf());
        }
    }
    if entries.len() == before {
        return None;
    }
    env::join_paths(entries).ok()
}

/// Point `SSL_CERT_FILE` at the system CA bundle unless the user already set it.
pub fn configure_trust_store() {
    if env::var_os("SSL_CERT_FILE").is_some() {
        return;
    }
    match find_ca_bundle(CA_BUNDLE_CANDIDATES) {
        Some(bundle) => {
            log::debug!("Using CA bundle {}", bundle.display());
            env::set_var("SSL_CERT_FILE", bundle);
        }
        None => log::debug!("No system CA bundle found"),
    }
}

pub fn find_ca_bundle(candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}
