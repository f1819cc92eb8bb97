use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use clap::{Parser, Subcommand};

use whisper_transcriber_core::job::domain::failure_hint::with_hint;
use whisper_transcriber_core::job::domain::job::Job;
use whisper_transcriber_core::job::domain::language::Language;
use whisper_transcriber_core::job::infrastructure::process_launcher::ProcessLauncher;
use whisper_transcriber_core::job::infrastructure::text_file_sink::TextFileSink;
use whisper_transcriber_core::model::domain::catalog;
use whisper_transcriber_core::model::domain::model_reference::{
    discover_local_models, ModelReference,
};
use whisper_transcriber_core::model::infrastructure::model_resolver;
use whisper_transcriber_core::pipeline::job_controller::{JobController, JobEvent};
use whisper_transcriber_core::pipeline::worker_process;
use whisper_transcriber_core::shared::constants::{DEFAULT_MODEL, POLL_INTERVAL};
use whisper_transcriber_core::shared::settings::Settings;
use whisper_transcriber_core::shared::time_format::format_elapsed;

/// Exit status after Ctrl-C, as shells report for SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

/// Transcribe audio files with whisper.cpp.
#[derive(Parser)]
#[command(name = "whisper-transcribe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe an audio file to a .txt file next to it.
    Transcribe {
        /// Audio or video file (mp3, wav, m4a, mp4, flac, ...).
        audio: PathBuf,

        /// Catalog model name or local model directory (default: last used).
        #[arg(long)]
        model: Option<String>,

        /// Spoken language name or code, or "auto" to detect it.
        #[arg(long, default_value = "auto")]
        language: Language,
    },
    /// List available models.
    Models,
    /// Download a catalog model into the cache.
    Download {
        /// Catalog model name.
        model: String,
    },
    /// Remove a downloaded model from the cache.
    ClearCache {
        /// Catalog model name.
        model: String,
    },
}

fn main() {
    env_logger::init();

    if let Some(code) = worker_process::dispatch() {
        process::exit(code);
    }

    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Transcribe {
            audio,
            model,
            language,
        } => transcribe(&audio, model, language),
        Command::Models => {
            list_models();
            Ok(0)
        }
        Command::Download { model } => {
            download(&model)?;
            Ok(0)
        }
        Command::ClearCache { model } => {
            if model_resolver::clear_cache(&model)? {
                println!("Removed cached model {model}");
            } else {
                println!("Model {model} is not cached");
            }
            Ok(0)
        }
    }
}

fn transcribe(
    audio: &Path,
    model: Option<String>,
    language: Language,
) -> Result<i32, Box<dyn std::error::Error>> {
    if !audio.exists() {
        return Err(format!("Audio file not found: {}", audio.display()).into());
    }

    let mut settings = Settings::load();
    let model = model
        .or_else(|| settings.last_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    settings.remember_model(&model);
    settings.save();

    let reference = ModelReference::parse(&model);
    let job = Job::new(audio, reference.clone(), language);

    install_interrupt_handler();
    let mut controller =
        JobController::new(ProcessLauncher::current_exe()?, Box::new(TextFileSink));
    controller.start(job)?;

    loop {
        if INTERRUPTED.load(Ordering::SeqCst) {
            controller.cancel();
            println!("\n[Stopped] Transcription stopped by user.");
            return Ok(EXIT_INTERRUPTED);
        }

        for event in controller.poll_tick() {
            match event {
                JobEvent::Log(text) => print!("{text}"),
                JobEvent::Completed {
                    duration, saved, ..
                } => {
                    println!();
                    let path = saved?;
                    println!("SUCCESS: Transcription saved to: {}", path.display());
                    println!("Time taken: {}", format_elapsed(duration));
                    return Ok(0);
                }
                JobEvent::Failed(message) => {
                    println!();
                    eprintln!("Error: {}", with_hint(&message, &reference));
                    return Ok(1);
                }
                JobEvent::SilentExit { status } => {
                    println!();
                    eprintln!("Error: transcription process ended unexpectedly ({status})");
                    return Ok(1);
                }
            }
        }
        let _ = io::stdout().flush();
        thread::sleep(POLL_INTERVAL);
    }
}

fn list_models() {
    println!("Catalog models:");
    for entry in catalog::CATALOG {
        let cached = if model_resolver::is_cached(entry.id) {
            "[cached]"
        } else {
            "        "
        };
        println!("  {cached} {:<24} {}", entry.id, entry.info);
    }

    let settings = Settings::load();
    if let Some(dir) = settings.last_model_dir {
        let local = discover_local_models(&dir);
        if !local.is_empty() {
            println!("\nLocal models in {}:", dir.display());
            for path in local {
                println!("  {}", path.display());
            }
        }
    }
}

fn download(model: &str) -> Result<(), Box<dyn std::error::Error>> {
    if catalog::lookup(model).is_none() {
        return Err(format!(
            "Unknown model '{model}'. Available: {}",
            catalog::ids().collect::<Vec<_>>().join(", ")
        )
        .into());
    }
    let reference = ModelReference::Remote(model.to_string());
    let path = model_resolver::resolve(&reference, Some(&mut download_progress))
        .map_err(|e| with_hint(&e.to_string(), &reference))?;
    eprintln!();
    println!("Model ready at {}", path.display());
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_interrupt(_: nix::libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_interrupt_handler() {
    use nix::sys::signal::{signal, SigHandler, Signal};

    // SAFETY: the handler only stores to an atomic.
    if let Err(e) = unsafe { signal(Signal::SIGINT, SigHandler::Handler(on_interrupt)) } {
        log::warn!("Ctrl-C will not stop the transcription cleanly: {e}");
    }
}

#[cfg(not(unix))]
fn install_interrupt_handler() {}
