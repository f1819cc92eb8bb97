use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::job::domain::job::Job;
use crate::job::domain::transcriber::{TranscribeRequest, Transcriber};
use crate::job::domain::worker_message::WorkerMessage;
use crate::job::infrastructure::message_channel::ChannelSender;
use crate::job::infrastructure::output_interceptor::OutputInterceptor;

/// How much of the worker's output is relayed to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Only what the transcriber writes to its diagnostic sink.
    InjectedSink,
    /// Also everything written to the process's stdout and stderr.
    NativeStreams,
}

/// Run one job and report its outcome on `channel`.
///
/// Sends any number of `Log` messages and then exactly one terminal message,
/// which is also returned. Transcriber errors and panics both become `Error`.
pub fn run_worker(
    job: &Job,
    channel: &ChannelSender,
    transcriber: &dyn Transcriber,
    capture: CaptureMode,
) -> WorkerMessage {
    let mut interceptor = match capture {
        CaptureMode::InjectedSink => OutputInterceptor::install(channel),
        CaptureMode::NativeStreams => OutputInterceptor::install_native(channel)
            .unwrap_or_else(|e| {
                log::warn!("Output capture unavailable ({e}), relaying injected output only");
                OutputInterceptor::install(channel)
            }),
    };

    let outcome = {
        let sink = interceptor.sink();
        write_banner(job, sink);

        let request = TranscribeRequest {
            audio_path: job.audio_path(),
            model: job.model(),
            language: job.language_code(),
        };
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            transcriber.transcribe(&request, &mut *sink)
        }));
        let duration = started.elapsed().as_secs_f64();

        match result {
            Ok(Ok(transcript)) => WorkerMessage::Success {
                text: transcript.text,
                duration,
            },
            Ok(Err(e)) => WorkerMessage::Error {
                message: e.to_string(),
            },
            Err(payload) => WorkerMessage::Error {
                message: panic_message(payload.as_ref()),
            },
        }
    };

    // Every captured log must reach the channel before the terminal message.
    interceptor.uninstall();
    if let Err(e) = channel.send(&outcome) {
        log::error!("Failed to report worker result: {e}");
    }
    outcome
}

fn write_banner(job: &Job, sink: &mut dyn Write) {
    let language = match job.language_code() {
        Some(code) => format!("Language set to: {} ({code})", job.language()),
        None => "Language: Auto-detect".to_string(),
    };
    let banner = format!(
        "Starting transcription for: {}\nLoading model ({})...\n{language}\n",
        job.audio_path().display(),
        job.model(),
    );
    if let Err(e) = sink.write_all(banner.as_bytes()) {
        log::warn!("Failed to write job banner: {e}");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Transcription crashed: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::domain::language::Language;
    use crate::job::domain::transcriber::Transcript;
    use crate::model::domain::model_reference::ModelReference;
    use crate::test_support::SharedBuffer;
    use std::sync::Mutex;

    // ─── Stubs ───

    /// Writes `chunks` to the diagnostic sink, then returns `result`.
    struct StubTranscriber {
        chunks: Vec<&'static str>,
        result: Result<&'static str, &'static str>,
        seen_language: Mutex<Option<Option<String>>>,
    }

    impl StubTranscriber {
        fn new(chunks: Vec<&'static str>, result: Result<&'static str, &'static str>) -> Self {
            Self {
                chunks,
                result,
                seen_language: Mutex::new(None),
            }
        }
    }

    impl Transcriber for StubTranscriber {
        fn transcribe(
            &self,
            request: &TranscribeRequest<'_>,
            diagnostics: &mut dyn Write,
        ) -> Result<Transcript, Box<dyn std::error::Error>> {
            *self.seen_language.lock().unwrap() = Some(request.language.map(str::to_string));
            for chunk in &self.chunks {
                diagnostics.write_all(chunk.as_bytes())?;
            }
            match self.result {
                Ok(text) => Ok(Transcript {
                    text: text.to_string(),
                }),
                Err(message) => Err(message.into()),
            }
        }
    }

    struct PanickingTranscriber;

    impl Transcriber for PanickingTranscriber {
        fn transcribe(
            &self,
            _: &TranscribeRequest<'_>,
            _: &mut dyn Write,
        ) -> Result<Transcript, Box<dyn std::error::Error>> {
            panic!("model file is corrupt");
        }
    }

    fn job(language: Language) -> Job {
        Job::new(
            "/audio/clip.wav",
            ModelReference::Remote("whisper-tiny".into()),
            language,
        )
    }

    fn run(transcriber: &dyn Transcriber, language: Language) -> (WorkerMessage, Vec<WorkerMessage>) {
        let buffer = SharedBuffer::default();
        let channel = ChannelSender::new(buffer.clone());
        let outcome = run_worker(&job(language), &channel, transcriber, CaptureMode::InjectedSink);
        (outcome, buffer.messages())
    }

    fn terminals(messages: &[WorkerMessage]) -> usize {
        messages.iter().filter(|m| m.is_terminal()).count()
    }

    // ─── Tests ───

    #[test]
    fn test_success_follows_all_logs() {
        let transcriber = StubTranscriber::new(vec!["[00:00.000 --> 00:01.000] hi\n"], Ok("hi"));

        let (outcome, messages) = run(&transcriber, Language::Auto);

        assert!(matches!(outcome, WorkerMessage::Success { ref text, .. } if text == "hi"));
        assert_eq!(terminals(&messages), 1);
        assert_eq!(messages.last(), Some(&outcome));
        assert!(messages.contains(&WorkerMessage::log("[00:00.000 --> 00:01.000] hi\n")));
    }

    #[test]
    fn test_banner_comes_first() {
        let transcriber = StubTranscriber::new(vec![], Ok(""));

        let (_, messages) = run(&transcriber, Language::Japanese);

        let WorkerMessage::Log { text } = &messages[0] else {
            panic!("expected a log first, got {:?}", messages[0]);
        };
        assert!(text.starts_with("Starting transcription for: /audio/clip.wav\n"));
        assert!(text.contains("Loading model (whisper-tiny)...\n"));
        assert!(text.contains("Language set to: Japanese (ja)\n"));
    }

    #[test]
    fn test_auto_banner() {
        let transcriber = StubTranscriber::new(vec![], Ok(""));
        let (_, messages) = run(&transcriber, Language::Auto);
        assert!(matches!(&messages[0], WorkerMessage::Log { text } if text.contains("Language: Auto-detect")));
    }

    #[test]
    fn test_language_hint_reaches_transcriber() {
        let japanese = StubTranscriber::new(vec![], Ok(""));
        run(&japanese, Language::Japanese);
        assert_eq!(
            *japanese.seen_language.lock().unwrap(),
            Some(Some("ja".to_string()))
        );

        let auto = StubTranscriber::new(vec![], Ok(""));
        run(&auto, Language::Auto);
        assert_eq!(*auto.seen_language.lock().unwrap(), Some(None));
    }

    #[test]
    fn test_failure_sends_exactly_one_error() {
        let transcriber = StubTranscriber::new(vec!["Loading model\n"], Err("network unreachable"));

        let (outcome, messages) = run(&transcriber, Language::Auto);

        let expected = WorkerMessage::Error {
            message: "network unreachable".into(),
        };
        assert_eq!(outcome, expected);
        assert_eq!(terminals(&messages), 1);
        assert_eq!(messages.last(), Some(&expected));
    }

    #[test]
    fn test_panic_is_reported_as_error() {
        let (outcome, messages) = run(&PanickingTranscriber, Language::Auto);

        assert!(
            matches!(&outcome, WorkerMessage::Error { message } if message.contains("model file is corrupt"))
        );
        assert_eq!(terminals(&messages), 1);
    }

    #[test]
    fn test_panic_message_fallback() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Transcription crashed: unknown panic");
    }
}
