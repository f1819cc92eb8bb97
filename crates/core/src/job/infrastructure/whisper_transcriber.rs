use std::io::Write;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use crate::job::domain::transcriber::{TranscribeRequest, Transcriber, Transcript};
use crate::model::domain::model_reference::ModelReference;
use crate::model::infrastructure::model_resolver;
use crate::shared::constants::WHISPER_SAMPLE_RATE;
use crate::shared::time_format::format_timestamp;

/// Transcriber backed by whisper.cpp via whisper-rs.
///
/// Resolves (and if needed downloads) the model, decodes the audio with
/// ffmpeg and prints every recognized segment to the diagnostic sink.
#[derive(Debug, Default)]
pub struct WhisperTranscriber;

impl Transcriber for WhisperTranscriber {
    fn transcribe(
        &self,
        request: &TranscribeRequest<'_>,
        diagnostics: &mut dyn Write,
    ) -> Result<Transcript, Box<dyn std::error::Error>> {
        let model_path = match request.model {
            ModelReference::Remote(id) if !model_resolver::is_cached(id) => {
                writeln!(diagnostics, "Downloading model {id}...")?;
                let mut progress = download_progress(&mut *diagnostics);
                model_resolver::resolve(request.model, Some(&mut progress))?
            }
            _ => model_resolver::resolve(request.model, None)?,
        };

        let audio = FfmpegAudioReader
            .read_audio(request.audio_path, WHISPER_SAMPLE_RATE)?
            .ok_or_else(|| format!("No audio stream in {}", request.audio_path.display()))?;
        writeln!(diagnostics, "Decoded {:.1}s of audio", audio.duration())?;

        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        let mut state = ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(request.language.unwrap_or("auto")));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);

        state
            .full(params, audio.samples())
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let mut parts = Vec::new();
        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };

            let mut text = String::new();
            for tok_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(tok_idx) else {
                    continue;
                };
                let Ok(piece) = token.to_str() else {
                    continue;
                };
                // Special tokens look like [_BEG_] or <|endoftext|>
                let trimmed = piece.trim();
                if trimmed.starts_with('[') || trimmed.starts_with('<') {
                    continue;
                }
                text.push_str(piece);
            }

            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            writeln!(
                diagnostics,
                "[{} --> {}] {text}",
                format_timestamp(segment.start_timestamp()),
                format_timestamp(segment.end_timestamp()),
            )?;
            parts.push(text.to_string());
        }

        Ok(Transcript {
            text: parts.join(" "),
        })
    }
}

/// Reports download progress in 10% steps on the diagnostic sink.
fn download_progress(diagnostics: &mut dyn Write) -> impl FnMut(u64, u64) + '_ {
    let mut last_step = 0;
    move |done, total| {
        if total == 0 {
            return;
        }
        let step = done * 10 / total;
        if step > last_step {
            last_step = step;
            let _ = writeln!(diagnostics, "Downloading model: {}%", step * 10);
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SharedBuffer;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_missing_local_model_errors_before_decoding() {
        let tmp = TempDir::new().unwrap();
        let model = ModelReference::Local(tmp.path().to_path_buf());
        let request = TranscribeRequest {
            audio_path: Path::new("/nonexistent/clip.wav"),
            model: &model,
            language: None,
        };
        let err = WhisperTranscriber
            .transcribe(&request, &mut SharedBuffer::default())
            .unwrap_err();
        assert!(err.to_string().contains("no whisper model file"), "got: {err}");
    }

    #[test]
    fn test_missing_audio_errors() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("ggml-tiny.bin"), b"lmgg").unwrap();
        let model = ModelReference::Local(tmp.path().to_path_buf());
        let request = TranscribeRequest {
            audio_path: Path::new("/nonexistent/clip.wav"),
            model: &model,
            language: Some("ja"),
        };
        let err = WhisperTranscriber
            .transcribe(&request, &mut SharedBuffer::default())
            .unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn test_download_progress_goes_to_diagnostics_in_steps() {
        let mut diagnostics = SharedBuffer::default();
        {
            let mut progress = download_progress(&mut diagnostics);
            progress(100, 0);
            progress(5, 100);
            progress(50, 100);
            progress(55, 100);
            progress(100, 100);
        }
        assert_eq!(
            String::from_utf8(diagnostics.bytes()).unwrap(),
            "Downloading model: 50%\nDownloading model: 100%\n"
        );
    }

    #[test]
    #[ignore] // Requires network access and whisper model download
    fn test_transcribe_sine_wave_does_not_crash() {
        let tmp = TempDir::new().unwrap();
        let audio_path = tmp.path().join("tone.wav");
        write_tone_wav(&audio_path);

        let model = ModelReference::Remote("whisper-tiny".into());
        let request = TranscribeRequest {
            audio_path: &audio_path,
            model: &model,
            language: Some("en"),
        };
        let diagnostics = SharedBuffer::default();
        let result = WhisperTranscriber.transcribe(&request, &mut diagnostics.clone());
        assert!(result.is_ok(), "Transcription should not error: {result:?}");
    }

    /// 3 seconds of a 440 Hz tone as 16-bit mono PCM.
    fn write_tone_wav(path: &Path) {
        let rate = WHISPER_SAMPLE_RATE;
        let samples: Vec<i16> = (0..rate * 3)
            .map(|i| {
                let t = i as f64 / rate as f64;
                ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 8000.0) as i16
            })
            .collect();
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }
}
