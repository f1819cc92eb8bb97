use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::domain::catalog;

#[derive(Error, Debug)]
pub enum ModelReferenceError {
    #[error("no whisper model file (*.bin) found in {0}")]
    NoModelFile(PathBuf),
    #[error("failed to read model directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a job's model comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ModelReference {
    /// Identifier from the model catalog, downloaded on first use.
    Remote(String),
    /// Directory holding a whisper.cpp model file.
    Local(PathBuf),
}

impl ModelReference {
    /// A string naming an existing directory is local; anything else is remote.
    pub fn parse(value: &str) -> Self {
        let path = Path::new(value);
        if path.is_dir() {
            ModelReference::Local(path.to_path_buf())
        } else {
            ModelReference::Remote(value.to_string())
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ModelReference::Local(_))
    }

    /// URL of the model page for remote models, the directory for local ones.
    pub fn source(&self) -> String {
        match self {
            ModelReference::Remote(id) => match catalog::lookup(id) {
                Some(entry) => entry.page_url(),
                None => format!("https://huggingface.co/{id}"),
            },
            ModelReference::Local(dir) => dir.display().to_string(),
        }
    }

    /// One-line description for the model picker.
    pub fn info(&self) -> &'static str {
        match self {
            ModelReference::Remote(id) => catalog::lookup(id)
                .map(|entry| entry.info)
                .unwrap_or("No information available"),
            ModelReference::Local(_) => "Local Model (Details unknown)",
        }
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelReference::Remote(id) => write!(f, "{id}"),
            ModelReference::Local(dir) => write!(f, "{}", dir.display()),
        }
    }
}

fn is_model_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("bin"))
            .unwrap_or(false)
}

fn model_files(dir: &Path) -> Result<Vec<PathBuf>, ModelReferenceError> {
    let entries = fs::read_dir(dir).map_err(|source| ModelReferenceError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_model_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// The model file inside a local model directory, preferring `ggml*` names.
pub fn find_model_file(dir: &Path) -> Result<PathBuf, ModelReferenceError> {
    let files = model_files(dir)?;
    let ggml = files.iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("ggml"))
            .unwrap_or(false)
    });
    ggml.or(files.first())
        .cloned()
        .ok_or_else(|| ModelReferenceError::NoModelFile(dir.to_path_buf()))
}

/// Model directories at or below `folder`.
///
/// Returns `folder` itself when it holds a model file; otherwise every
/// subdirectory that does, without descending into model directories. Sorted.
pub fn discover_local_models(folder: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_model_dirs(folder, &mut found);
    found.sort();
    found
}

fn collect_model_dirs(dir: &Path, found: &mut Vec<PathBuf>) {
    match model_files(dir) {
        Ok(files) if !files.is_empty() => {
            found.push(dir.to_path_buf());
            return;
        }
        Ok(_) => {}
        Err(e) => {
            log::debug!("Skipping {}: {e}", dir.display());
            return;
        }
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_model_dirs(&path, found);
        }
    }
}
