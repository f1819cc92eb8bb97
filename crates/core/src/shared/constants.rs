use std::time::Duration;

/// Cadence at which front ends drive `JobController::poll_tick`.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ticks a dead worker may stay silent before it is reported as a silent exit
/// (~1 second), unless its channel reaches end of stream sooner.
pub const SILENT_EXIT_GRACE_TICKS: u32 = 10;

/// Decoded worker messages buffered on the supervisor side before the reader
/// thread stops pulling from the pipe.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Environment variable carrying the JSON-encoded job into a worker process.
pub const WORKER_JOB_ENV: &str = "WHISPER_TRANSCRIBER_WORKER_JOB";

/// Directory name used under the platform config and cache directories.
pub const APP_DIR_NAME: &str = "Whisper Transcriber";

pub const MODEL_REPOSITORY_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp";
pub const DEFAULT_MODEL: &str = "whisper-large-v3";

pub const WHISPER_SAMPLE_RATE: u32 = 16000;

pub const TRANSCRIPT_EXTENSION: &str = "txt";
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "mp4", "flac"];

/// Directories GUI-launched processes usually miss from PATH on macOS.
pub const EXTRA_PATH_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin"];

/// System CA bundles, probed in order when `SSL_CERT_FILE` is unset.
pub const CA_BUNDLE_CANDIDATES: &[&str] = &[
    "/etc/ssl/cert.pem",
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/opt/homebrew/etc/openssl@3/cert.pem",
    "/usr/local/etc/openssl@3/cert.pem",
];
