//! Worker-to-supervisor message transport.
//!
//! The worker writes one JSON object per line to a byte stream (a pipe that
//! crosses the process boundary). On the supervisor side a reader thread
//! decodes the lines into a bounded in-process queue that the supervisor
//! drains without blocking. A full queue stalls the reader, which in turn
//! stalls the worker on the pipe, so nothing is dropped and nothing grows
//! without bound.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::job::domain::worker_message::WorkerMessage;
use crate::shared::constants::CHANNEL_CAPACITY;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("failed to encode worker message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write worker message: {0}")]
    Io(#[from] io::Error),
}

/// Sending half, held by the worker. Clones share the underlying stream.
#[derive(Clone)]
pub struct ChannelSender {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ChannelSender {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write `message` as a single line and flush it.
    ///
    /// The whole line is written under the lock so concurrent senders never
    /// interleave partial lines.
    pub fn send(&self, message: &WorkerMessage) -> Result<(), ChannelError> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Receiving half, owned by the supervisor for the lifetime of one job.
pub struct ChannelReceiver {
    rx: Receiver<WorkerMessage>,
    eof: Arc<AtomicBool>,
}

impl ChannelReceiver {
    /// Start decoding `reader` on a background thread.
    ///
    /// The thread ends at end of stream or once this receiver is dropped.
    pub fn spawn_reader(reader: impl Read + Send + 'static) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<WorkerMessage>(CHANNEL_CAPACITY);
        let eof = Arc::new(AtomicBool::new(false));
        let eof_flag = eof.clone();

        thread::spawn(move || {
            pump(BufReader::new(reader), &tx);
            eof_flag.store(true, Ordering::Release);
        });

        Self { rx, eof }
    }

    /// Next message in send order, or `None` if nothing is available right now.
    pub fn try_receive(&self) -> Option<WorkerMessage> {
        self.rx.try_recv().ok()
    }

    /// True once the stream has ended and every decoded message was received.
    pub fn is_closed(&self) -> bool {
        self.eof.load(Ordering::Acquire) && self.rx.is_empty()
    }
}

fn pump(reader: impl BufRead, tx: &Sender<WorkerMessage>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("Worker channel read failed: {e}");
                return;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<WorkerMessage>(trimmed) {
            Ok(message) => {
                if tx.send(message).is_err() {
                    // Supervisor dropped the job.
                    return;
                }
            }
            Err(e) => log::warn!("Skipping undecodable worker line ({e}): {trimmed}"),
        }
    }
}
