use std::io;

use crate::job::domain::job::Job;
use crate::job::domain::worker_message::WorkerMessage;

/// Supervisor-side handle to one running worker.
pub trait WorkerHandle: Send {
    /// Next message in send order, without blocking.
    fn try_receive(&mut self) -> Option<WorkerMessage>;

    /// `None` while the worker is alive, otherwise a description of how it exited.
    fn exit_status(&mut self) -> Option<String>;

    /// True once the worker's channel has ended and every message was received.
    fn is_closed(&self) -> bool;

    /// Forcibly terminate the worker. Not a cooperative request.
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts workers in an isolated execution context.
pub trait WorkerLauncher: Send {
    fn launch(&self, job: &Job) -> io::Result<Box<dyn WorkerHandle>>;
}
