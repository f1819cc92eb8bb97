use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::job::domain::language::Language;
use crate::model::domain::model_reference::ModelReference;
use crate::shared::constants::TRANSCRIPT_EXTENSION;

/// One request to transcribe one audio file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    audio_path: PathBuf,
    model: ModelReference,
    language: Language,
}

impl Job {
    pub fn new(audio_path: impl Into<PathBuf>, model: ModelReference, language: Language) -> Self {
        Self {
            audio_path: audio_path.into(),
            model,
            language,
        }
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn model(&self) -> &ModelReference {
        &self.model
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn language_code(&self) -> Option<&'static str> {
        self.language.code()
    }

    /// Sibling of the audio file with its extension replaced by `.txt`.
    pub fn transcript_path(&self) -> PathBuf {
        self.audio_path.with_extension(TRANSCRIPT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(path: &str, language: Language) -> Job {
        Job::new(path, ModelReference::Remote("whisper-tiny".into()), language)
    }

    #[test]
    fn test_transcript_path_replaces_extension() {
        assert_eq!(
            job("clip.wav", Language::Auto).transcript_path(),
            PathBuf::from("clip.txt")
        );
        assert_eq!(
            job("/audio/talk.final.m4a", Language::Auto).transcript_path(),
            PathBuf::from("/audio/talk.final.txt")
        );
    }

    #[test]
    fn test_transcript_path_without_extension() {
        assert_eq!(
            job("recording", Language::Auto).transcript_path(),
            PathBuf::from("recording.txt")
        );
    }

    #[test]
    fn test_language_code_follows_hint() {
        assert_eq!(job("a.wav", Language::Japanese).language_code(), Some("ja"));
        assert_eq!(job("a.wav", Language::Auto).language_code(), None);
    }

    #[test]
    fn test_job_survives_json_transport() {
        let original = job("/tmp/clip.wav", Language::French);
        let json = serde_json::to_string(&original).unwrap();
        let decoded: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }
}
