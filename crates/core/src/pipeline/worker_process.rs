//! Entry point of the worker process.
//!
//! Front-end binaries re-launch themselves as workers (see
//! [`ProcessLauncher::current_exe`](crate::job::infrastructure::process_launcher::ProcessLauncher::current_exe)).
//! Each binary calls [`dispatch`] first thing in `main`.

use std::env;
use std::io;

use crate::job::domain::job::Job;
use crate::job::domain::transcriber::Transcriber;
use crate::job::domain::worker_message::WorkerMessage;
use crate::job::infrastructure::environment::prepare_environment;
use crate::job::infrastructure::message_channel::ChannelSender;
use crate::job::infrastructure::whisper_transcriber::WhisperTranscriber;
use crate::pipeline::transcription_worker::{run_worker, CaptureMode};
use crate::shared::constants::WORKER_JOB_ENV;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// The worker could not even start the job.
pub const EXIT_SETUP: i32 = 2;

/// Run as a worker if this process was launched as one.
///
/// Returns the exit code to terminate with, or `None` for a normal start.
pub fn dispatch() -> Option<i32> {
    let payload = env::var(WORKER_JOB_ENV).ok()?;
    // Not inherited by anything the worker itself spawns.
    env::remove_var(WORKER_JOB_ENV);
    Some(worker_main(&payload))
}

fn worker_main(payload: &str) -> i32 {
    run_job(payload, &WhisperTranscriber)
}

fn run_job(payload: &str, transcriber: &dyn Transcriber) -> i32 {
    prepare_environment();

    let job: Job = match serde_json::from_str(payload) {
        Ok(job) => job,
        Err(e) => {
            log::error!("Invalid worker job: {e}");
            return EXIT_SETUP;
        }
    };

    let channel = match channel_transport() {
        Ok(transport) => ChannelSender::new(transport),
        Err(e) => {
            log::error!("Worker channel unavailable: {e}");
            return EXIT_SETUP;
        }
    };

    match run_worker(&job, &channel, transcriber, CaptureMode::NativeStreams) {
        WorkerMessage::Success { .. } => EXIT_SUCCESS,
        _ => EXIT_FAILURE,
    }
}

/// A private copy of stdout, so the channel survives stdout being captured.
#[cfg(unix)]
fn channel_transport() -> io::Result<std::fs::File> {
    use std::os::fd::{FromRawFd, OwnedFd};

    let fd = nix::unistd::dup(1)?;
    // SAFETY: `dup` returned a fresh descriptor that nothing else owns.
    Ok(std::fs::File::from(unsafe { OwnedFd::from_raw_fd(fd) }))
}

#[cfg(not(unix))]
fn channel_transport() -> io::Result<io::Stdout> {
    Ok(io::stdout())
}
