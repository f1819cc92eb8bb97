use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::job::domain::job::Job;
use crate::job::domain::result_sink::{PersistenceError, ResultSink};
use crate::job::domain::worker_launcher::{WorkerHandle, WorkerLauncher};
use crate::job::domain::worker_message::WorkerMessage;
use crate::shared::constants::SILENT_EXIT_GRACE_TICKS;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("a transcription is already running")]
    AlreadyRunning,
    #[error("failed to start worker process: {0}")]
    Spawn(#[source] io::Error),
}

/// What a poll tick observed, in the order it happened.
#[derive(Debug)]
pub enum JobEvent {
    Log(String),
    Completed {
        text: String,
        duration: f64,
        saved: Result<PathBuf, PersistenceError>,
    },
    Failed(String),
    /// The worker died without a terminal message.
    SilentExit { status: String },
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Log(_))
    }
}

struct RunningJob {
    job: Job,
    handle: Box<dyn WorkerHandle>,
    silent_ticks: u32,
}

enum State {
    Idle,
    Running(RunningJob),
}

/// Owns the lifecycle of at most one transcription job.
///
/// Never blocks: the host loop calls [`poll_tick`](Self::poll_tick) on a fixed
/// cadence while [`is_running`](Self::is_running) is true.
///
/// ```text
/// Idle --start--> Running --terminal message / silent exit--> Idle
///                 Running --cancel--> Idle
/// ```
pub struct JobController<L: WorkerLauncher> {
    launcher: L,
    sink: Box<dyn ResultSink>,
    state: State,
    grace_ticks: u32,
}

impl<L: WorkerLauncher> JobController<L> {
    pub fn new(launcher: L, sink: Box<dyn ResultSink>) -> Self {
        Self {
            launcher,
            sink,
            state: State::Idle,
            grace_ticks: SILENT_EXIT_GRACE_TICKS,
        }
    }

    /// Ticks a dead, silent worker is given before it is reported.
    pub fn with_grace_ticks(mut self, grace_ticks: u32) -> Self {
        self.grace_ticks = grace_ticks;
        self
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    pub fn current_job(&self) -> Option<&Job> {
        match &self.state {
            State::Running(running) => Some(&running.job),
            State::Idle => None,
        }
    }

    pub fn start(&mut self, job: Job) -> Result<(), JobError> {
        if self.is_running() {
            return Err(JobError::AlreadyRunning);
        }
        let handle = self.launcher.launch(&job).map_err(JobError::Spawn)?;
        log::info!("Started transcription of {}", job.audio_path().display());
        self.state = State::Running(RunningJob {
            job,
            handle,
            silent_ticks: 0,
        });
        Ok(())
    }

    /// Drain everything the worker has sent so far.
    ///
    /// Stops at the first terminal message; the worker and its channel are
    /// dropped and nothing more from that job is read.
    pub fn poll_tick(&mut self) -> Vec<JobEvent> {
        let State::Running(running) = &mut self.state else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let mut terminal = None;
        while let Some(message) = running.handle.try_receive() {
            match message {
                WorkerMessage::Log { text } => events.push(JobEvent::Log(text)),
                message => {
                    terminal = Some(message);
                    break;
                }
            }
        }

        if let Some(message) = terminal {
            let State::Running(finished) = std::mem::replace(&mut self.state, State::Idle) else {
                return events;
            };
            events.push(self.finish(finished, message));
            return events;
        }

        if !events.is_empty() {
            running.silent_ticks = 0;
            return events;
        }

        let Some(status) = running.handle.exit_status() else {
            return events;
        };
        // Output may still be in flight after the process is gone. The grace
        // bound covers a channel held open by something other than the worker.
        running.silent_ticks += 1;
        if !running.handle.is_closed() && running.silent_ticks < self.grace_ticks {
            return events;
        }

        log::warn!("Worker exited without a result ({status})");
        self.state = State::Idle;
        events.push(JobEvent::SilentExit { status });
        events
    }

    fn finish(&self, finished: RunningJob, message: WorkerMessage) -> JobEvent {
        let RunningJob { job, handle, .. } = finished;
        drop(handle);
        match message {
            WorkerMessage::Success { text, duration } => {
                log::info!("Transcription finished in {duration:.1}s");
                let saved = self.sink.persist(&job, &text);
                if let Err(e) = &saved {
                    log::error!("{e}");
                }
                JobEvent::Completed {
                    text,
                    duration,
                    saved,
                }
            }
            WorkerMessage::Error { message } => {
                log::error!("Transcription failed: {message}");
                JobEvent::Failed(message)
            }
            WorkerMessage::Log { text } => JobEvent::Log(text),
        }
    }

    /// Kill the running worker and return to idle. No result is persisted.
    ///
    /// Returns false when nothing was running.
    pub fn cancel(&mut self) -> bool {
        let State::Running(mut running) = std::mem::replace(&mut self.state, State::Idle) else {
            return false;
        };
        if let Err(e) = running.handle.kill() {
            log::warn!("Failed to kill worker: {e}");
        }
        log::info!("Transcription stopped by user");
        true
    }
}

impl<L: WorkerLauncher> Drop for JobController<L> {
    fn drop(&mut self) {
        self.cancel();
    }
}
