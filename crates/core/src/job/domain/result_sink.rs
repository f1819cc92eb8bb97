use std::path::PathBuf;

use thiserror::Error;

use crate::job::domain::job::Job;

#[derive(Error, Debug)]
#[error("could not save transcript to {}: {source}", path.display())]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Domain interface for storing a finished transcript.
///
/// Called by the supervisor exactly once per successful job.
pub trait ResultSink: Send {
    fn persist(&self, job: &Job, text: &str) -> Result<PathBuf, PersistenceError>;
}
