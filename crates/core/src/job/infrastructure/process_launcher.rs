use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::job::domain::job::Job;
use crate::job::domain::worker_launcher::{WorkerHandle, WorkerLauncher};
use crate::job::domain::worker_message::WorkerMessage;
use crate::job::infrastructure::message_channel::ChannelReceiver;
use crate::shared::constants::WORKER_JOB_ENV;

/// Runs each job in a child process.
///
/// The child receives the job as JSON in `WORKER_JOB_ENV` and answers with
/// JSON lines on its stdout. Its stderr is inherited.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-launch the running executable. Its `main` must call
    /// `worker_process::dispatch` before anything else.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, Vec::new()))
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, job: &Job) -> io::Result<Box<dyn WorkerHandle>> {
        let payload = serde_json::to_string(job).map_err(io::Error::other)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(WORKER_JOB_ENV, payload)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::other("worker stdout was not captured"));
        };
        log::debug!("Worker process {} started", child.id());

        Ok(Box::new(ProcessWorkerHandle {
            child,
            receiver: ChannelReceiver::spawn_reader(stdout),
            reaped: None,
        }))
    }
}

pub struct ProcessWorkerHandle {
    child: Child,
    receiver: ChannelReceiver,
    reaped: Option<String>,
}

impl WorkerHandle for ProcessWorkerHandle {
    fn try_receive(&mut self) -> Option<WorkerMessage> {
        self.receiver.try_receive()
    }

    fn exit_status(&mut self) -> Option<String> {
        if self.reaped.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => self.reaped = Some(status.to_string()),
                Ok(None) => return None,
                Err(e) => self.reaped = Some(format!("unknown ({e})")),
            }
        }
        self.reaped.clone()
    }

    fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    fn kill(&mut self) -> io::Result<()> {
        if self.reaped.is_some() {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => {}
            // Already exited on its own.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        let status = self.child.wait()?;
        log::debug!("Worker process {} killed ({status})", self.child.id());
        self.reaped = Some(status.to_string());
        Ok(())
    }
}

impl Drop for ProcessWorkerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            log::warn!("Failed to stop worker process {}: {e}", self.child.id());
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::job::domain::language::Language;
    use crate::model::domain::model_reference::ModelReference;
    use std::thread;
    use std::time::{Duration, Instant};

    fn job() -> Job {
        Job::new(
            "/tmp/clip.wav",
            ModelReference::Remote("whisper-tiny".into()),
            Language::Japanese,
        )
    }

    fn shell(script: &str) -> ProcessLauncher {
        ProcessLauncher::new("sh", vec!["-c".into(), script.into()])
    }

    fn wait_for_exit(handle: &mut dyn WorkerHandle) -> String {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(status) = handle.exit_status() {
                return status;
            }
            assert!(Instant::now() < deadline, "worker did not exit");
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn drain(handle: &mut dyn WorkerHandle) -> Vec<WorkerMessage> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut out = Vec::new();
        while Instant::now() < deadline {
            match handle.try_receive() {
                Some(message) => {
                    let terminal = message.is_terminal();
                    out.push(message);
                    if terminal {
                        break;
                    }
                }
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        out
    }

    #[test]
    fn test_messages_cross_the_process_boundary() {
        let launcher = shell(
            r#"printf '{"type":"log","text":"one"}\n{"type":"log","text":"two"}\n{"type":"success","text":"hi","duration":0.5}\n'"#,
        );
        let mut handle = launcher.launch(&job()).unwrap();

        assert_eq!(
            drain(handle.as_mut()),
            vec![
                WorkerMessage::log("one"),
                WorkerMessage::log("two"),
                WorkerMessage::Success {
                    text: "hi".into(),
                    duration: 0.5
                },
            ]
        );
        wait_for_exit(handle.as_mut());
    }

    #[test]
    fn test_job_is_passed_through_environment() {
        let launcher = shell(&format!(
            r#"printf '{{"type":"log","text":"%s"}}\n' "$(printf %s "${WORKER_JOB_ENV}" | grep -c clip.wav)""#
        ));
        let mut handle = launcher.launch(&job()).unwrap();
        assert_eq!(drain(handle.as_mut()), vec![WorkerMessage::log("1")]);
    }

    #[test]
    fn test_exit_status_reports_silent_exit() {
        let mut handle = shell("exit 3").launch(&job()).unwrap();
        let status = wait_for_exit(handle.as_mut());
        assert!(status.contains('3'), "got: {status}");
        assert_eq!(handle.try_receive(), None);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_closed() {
            assert!(Instant::now() < deadline, "channel never reached end of stream");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_channel_stays_open_while_worker_runs() {
        let handle = shell("sleep 30").launch(&job()).unwrap();
        assert!(!handle.is_closed());
    }

    #[test]
    fn test_kill_terminates_running_worker() {
        let mut handle = shell("sleep 30").launch(&job()).unwrap();
        assert_eq!(handle.exit_status(), None);

        let started = Instant::now();
        handle.kill().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(handle.exit_status().is_some());
        // Killing twice is harmless.
        handle.kill().unwrap();
    }

    #[test]
    fn test_missing_program_fails_to_launch() {
        let launcher = ProcessLauncher::new("/nonexistent/worker-binary", Vec::new());
        assert!(launcher.launch(&job()).is_err());
    }
}
