use std::io::Write;
use std::path::Path;

use crate::model::domain::model_reference::ModelReference;

/// Arguments for one heavy call.
#[derive(Debug, Clone, Copy)]
pub struct TranscribeRequest<'a> {
    pub audio_path: &'a Path,
    pub model: &'a ModelReference,
    /// ISO 639-1 code, or `None` to auto-detect.
    pub language: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
}

/// Domain interface for the heavy, non-interruptible transcription call.
///
/// Anything the implementation wants to report while it runs goes to
/// `diagnostics`; the worker binds that sink to the message channel.
pub trait Transcriber {
    fn transcribe(
        &self,
        request: &TranscribeRequest<'_>,
        diagnostics: &mut dyn Write,
    ) -> Result<Transcript, Box<dyn std::error::Error>>;
}
