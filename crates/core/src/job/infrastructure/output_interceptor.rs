use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};

use crate::job::domain::worker_message::WorkerMessage;
use crate::job::infrastructure::message_channel::ChannelSender;

/// Diagnostic sink that forwards every write as a `Log` message.
///
/// Chunks are forwarded as written; a chunk is not necessarily a line.
#[derive(Clone)]
pub struct LogForwarder {
    sender: ChannelSender,
}

impl LogForwarder {
    pub fn new(sender: ChannelSender) -> Self {
        Self { sender }
    }
}

impl Write for LogForwarder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let text = String::from_utf8_lossy(buf).into_owned();
        self.sender
            .send(&WorkerMessage::Log { text })
            .map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Number of trailing bytes that start a UTF-8 sequence the buffer does not
/// yet hold completely.
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = match byte {
            0xF0..=0xFF => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

/// Split off everything in `pending` up to the last complete UTF-8 sequence,
/// leaving a trailing partial character in place for the next read.
pub fn take_complete_utf8(pending: &mut Vec<u8>) -> Vec<u8> {
    let keep = incomplete_tail_len(pending);
    let tail = pending.split_off(pending.len() - keep);
    std::mem::replace(pending, tail)
}

/// Copy `reader` into `forwarder` until end of stream.
///
/// Reading continues after forwarding fails so that writers into the
/// captured stream never block on a full pipe. Nothing is logged from here:
/// in the worker, the log output would land back in `reader`.
pub fn relay_output(mut reader: impl Read, mut forwarder: LogForwarder) {
    let mut buf = [0u8; 4096];
    let mut pending = Vec::new();
    let mut forwarding = true;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        if !forwarding {
            continue;
        }
        pending.extend_from_slice(&buf[..n]);
        let chunk = take_complete_utf8(&mut pending);
        if forwarder.write_all(&chunk).is_err() {
            forwarding = false;
        }
    }

    if forwarding && !pending.is_empty() {
        let _ = forwarder.write_all(&pending);
    }
}

/// Redirects the process's stdout and stderr descriptors into a pipe whose
/// contents are relayed as `Log` messages.
///
/// Covers output written by native libraries straight to the descriptors.
/// The channel transport must not be descriptor 1 itself; duplicate it first.
///
/// Everything captured passes through one pipe and one relay thread, so
/// output keeps the order in which it was written.
#[cfg(unix)]
pub struct NativeOutputCapture {
    saved_stderr: std::os::fd::OwnedFd,
    relay: Option<JoinHandle<()>>,
    // Unbuffered, and descriptor 2 is the pipe while installed.
    stderr: io::Stderr,
}

#[cfg(unix)]
impl NativeOutputCapture {
    const STDOUT: std::os::fd::RawFd = 1;
    const STDERR: std::os::fd::RawFd = 2;

    pub fn install(forwarder: LogForwarder) -> io::Result<Self> {
        use nix::unistd::{dup, dup2, pipe};
        use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

        io::stdout().flush()?;
        io::stderr().flush()?;

        // SAFETY: `dup` returned a fresh descriptor that nothing else owns.
        let saved_stderr = unsafe { OwnedFd::from_raw_fd(dup(Self::STDERR)?) };
        let (read_end, write_end) = pipe()?;
        dup2(write_end.as_raw_fd(), Self::STDOUT)?;
        dup2(write_end.as_raw_fd(), Self::STDERR)?;
        // Descriptors 1 and 2 now hold the only write ends.
        drop(write_end);

        let reader = std::fs::File::from(read_end);
        let relay = thread::Builder::new()
            .name("output-relay".into())
            .spawn(move || relay_output(reader, forwarder))?;

        Ok(Self {
            saved_stderr,
            relay: Some(relay),
            stderr: io::stderr(),
        })
    }

    /// Writer into the capture pipe, ordered with the process's own output.
    pub fn sink(&mut self) -> &mut dyn Write {
        &mut self.stderr
    }
}

#[cfg(unix)]
impl Drop for NativeOutputCapture {
    fn drop(&mut self) {
        use nix::unistd::dup2;
        use std::os::fd::AsRawFd;

        let _ = io::stdout().flush();
        // Point both descriptors at the original stderr. This closes the
        // pipe's write ends so the relay sees end of stream.
        let saved = self.saved_stderr.as_raw_fd();
        let _ = dup2(saved, Self::STDOUT);
        let _ = dup2(saved, Self::STDERR);
        if let Some(relay) = self.relay.take() {
            let _ = relay.join();
        }
    }
}

/// Capture installed around the heavy call.
///
/// `sink()` is the diagnostic writer handed to the call. With native capture
/// the process's own stdout and stderr are relayed too, and the sink writes
/// into the same pipe. `uninstall` returns only after all captured output has
/// been forwarded.
pub struct OutputInterceptor {
    forwarder: LogForwarder,
    #[cfg(unix)]
    native: Option<NativeOutputCapture>,
}

impl OutputInterceptor {
    /// Injected sink only. Process descriptors are left alone.
    pub fn install(sender: &ChannelSender) -> Self {
        Self {
            forwarder: LogForwarder::new(sender.clone()),
            #[cfg(unix)]
            native: None,
        }
    }

    /// Injected sink plus descriptor capture where the platform allows it.
    pub fn install_native(sender: &ChannelSender) -> io::Result<Self> {
        #[cfg(unix)]
        {
            let native = NativeOutputCapture::install(LogForwarder::new(sender.clone()))?;
            Ok(Self {
                forwarder: LogForwarder::new(sender.clone()),
                native: Some(native),
            })
        }
        #[cfg(not(unix))]
        {
            log::debug!("Descriptor capture unavailable, relaying injected output only");
            Ok(Self::install(sender))
        }
    }

    pub fn sink(&mut self) -> &mut dyn Write {
        #[cfg(unix)]
        {
            if let Some(native) = self.native.as_mut() {
                return native.sink();
            }
        }
        &mut self.forwarder
    }

    pub fn uninstall(self) {
        #[cfg(unix)]
        drop(self.native);
    }
}
