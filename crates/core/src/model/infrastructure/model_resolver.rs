use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::domain::catalog::{self, CatalogEntry};
use crate::model::domain::model_reference::{self, ModelReference, ModelReferenceError};
use crate::shared::constants::APP_DIR_NAME;

/// First four bytes of a whisper.cpp model file (`0x67676d6c`, little-endian).
const GGML_MAGIC: [u8; 4] = *b"lmgg";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error(transparent)]
    Local(#[from] ModelReferenceError),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("response from {url} is not a model file (blocked by a proxy or firewall?)")]
    NotAModel { url: String },
    #[error("failed to remove cached model {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u64, u64);

/// Resolve a model reference to the model file on disk.
///
/// Local references point into their directory. Remote references are served
/// from the user cache, downloading into it on first use.
pub fn resolve(
    reference: &ModelReference,
    progress: Option<ProgressFn<'_>>,
) -> Result<PathBuf, ModelResolveError> {
    match reference {
        ModelReference::Local(dir) => Ok(model_reference::find_model_file(dir)?),
        ModelReference::Remote(id) => {
            let entry = catalog_entry(id)?;
            resolve_in(&model_cache_dir()?, entry, progress)
        }
    }
}

fn resolve_in(
    cache_dir: &Path,
    entry: &CatalogEntry,
    progress: Option<ProgressFn<'_>>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(entry.file_name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    log::info!("Downloading {} from {}", entry.id, entry.download_url());
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(&entry.download_url(), &cached_path, progress)?;
    Ok(cached_path)
}

fn catalog_entry(id: &str) -> Result<&'static CatalogEntry, ModelResolveError> {
    catalog::lookup(id).ok_or_else(|| ModelResolveError::UnknownModel(id.to_string()))
}

/// Where a catalog model lives once downloaded.
pub fn cached_path(id: &str) -> Result<PathBuf, ModelResolveError> {
    let entry = catalog_entry(id)?;
    Ok(model_cache_dir()?.join(entry.file_name))
}

/// Whether the model file for a catalog model is already downloaded.
pub fn is_cached(id: &str) -> bool {
    cached_path(id).map(|path| path.exists()).unwrap_or(false)
}

/// Remove a downloaded model, e.g. after a corrupted download.
/// Returns false when nothing was cached.
pub fn clear_cache(id: &str) -> Result<bool, ModelResolveError> {
    let path = cached_path(id)?;
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ModelResolveError::Remove { path, source }),
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Whisper Transcriber/models/`
/// - Linux: `$XDG_CACHE_HOME/Whisper Transcriber/models/` or `~/.cache/Whisper Transcriber/models/`
/// - Windows: `%LOCALAPPDATA%/Whisper Transcriber/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(
    url: &str,
    dest: &Path,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let total = response.content_length().unwrap_or(0);

    // Stream into a temp file first, then rename for atomicity
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };

    let result = (|| -> Result<(), ModelResolveError> {
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        let mut buf = vec![0u8; 1024 * 1024];
        let mut downloaded: u64 = 0;
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(write_err(e)),
            };
            file.write_all(&buf[..n]).map_err(write_err)?;
            downloaded += n as u64;
            if let Some(cb) = progress.as_deref_mut() {
                cb(downloaded, total);
            }
        }
        file.flush().map_err(write_err)?;
        drop(file);

        if !has_model_magic(&temp_path).map_err(write_err)? {
            return Err(ModelResolveError::NotAModel {
                url: url.to_string(),
            });
        }
        fs::rename(&temp_path, dest).map_err(|source| ModelResolveError::Write {
            path: dest.to_path_buf(),
            source,
        })
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn has_model_magic(path: &Path) -> io::Result<bool> {
    let mut header = [0u8; 4];
    let mut file = fs::File::open(path)?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(header == GGML_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_in_returns_cached_file_without_download() {
        let tmp = TempDir::new().unwrap();
        let entry = catalog::lookup("whisper-tiny").unwrap();
        let cached = tmp.path().join(entry.file_name);
        fs::write(&cached, b"lmgg fake model").unwrap();

        let resolved = resolve_in(tmp.path(), entry, None).unwrap();
        assert_eq!(resolved, cached);
    }

    #[test]
    fn test_resolve_local_reference_finds_model_file() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("ggml-base.bin");
        fs::write(&model, b"lmgg").unwrap();

        let resolved = resolve(&ModelReference::Local(tmp.path().to_path_buf()), None).unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_resolve_local_reference_without_model_errors() {
        let tmp = TempDir::new().unwrap();
        let err = resolve(&ModelReference::Local(tmp.path().to_path_buf()), None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Local(_)));
    }

    #[test]
    fn test_resolve_unknown_remote_errors() {
        let err = resolve(&ModelReference::Remote("whisper-enormous".into()), None).unwrap_err();
        assert!(matches!(err, ModelResolveError::UnknownModel(ref id) if id == "whisper-enormous"));
    }

    #[test]
    fn test_cached_path_uses_catalog_file_name() {
        let path = cached_path("whisper-small").unwrap();
        assert!(path.ends_with("ggml-small.bin"));
        assert!(!is_cached("whisper-enormous"));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_has_model_magic() {
        let tmp = TempDir::new().unwrap();
        let model = tmp.path().join("model.bin");
        let block_page = tmp.path().join("block.bin");
        let tiny = tmp.path().join("tiny.bin");
        fs::write(&model, b"lmgg\x01\x00\x00\x00").unwrap();
        fs::write(&block_page, b"<html><body>Blocked</body></html>").unwrap();
        fs::write(&tiny, b"lm").unwrap();

        assert!(has_model_magic(&model).unwrap());
        assert!(!has_model_magic(&block_page).unwrap());
        assert!(!has_model_magic(&tiny).unwrap());
    }

    #[test]
    fn test_download_invalid_url_returns_error() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.bin");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.bin");
        let _ = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
