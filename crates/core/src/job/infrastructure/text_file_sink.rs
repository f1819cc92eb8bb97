use std::fs;
use std::path::PathBuf;

use crate::job::domain::job::Job;
use crate::job::domain::result_sink::{PersistenceError, ResultSink};

/// Writes the transcript next to the audio file, e.g. `clip.wav` -> `clip.txt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFileSink;

impl ResultSink for TextFileSink {
    fn persist(&self, job: &Job, text: &str) -> Result<PathBuf, PersistenceError> {
        let path = job.transcript_path();
        match fs::write(&path, text) {
            Ok(()) => {
                log::info!("Transcript saved to {}", path.display());
                Ok(path)
            }
            Err(source) => Err(PersistenceError { path, source }),
        }
    }
}
