//! The synchronization boundary between producers and one destination.

use crate::error::{Error, Result};
use crate::sink::{Custody, LineSink};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, LockResult, Mutex, MutexGuard};
use tracing::{debug, trace, warn};

/// Unwraps a lock result, taking over the guard or value a panicking thread
/// left behind.
pub(crate) fn recover<T>(result: LockResult<T>, lock: &'static str) -> T {
    result.unwrap_or_else(|poisoned| {
        warn!(lock, "lock was poisoned by a panicking thread; recovering");
        poisoned.into_inner()
    })
}

struct SinkState<W> {
    out: Custody<W>,
    closed: bool,
    lines_written: u64,
}

impl<W: Write> SinkState<W> {
    /// Completes any held remainder, then writes `payload`.
    fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.finish_unsent()?;
        self.out.write_payload(payload)?;
        self.lines_written += 1;
        Ok(())
    }

    fn finish_unsent(&mut self) -> io::Result<()> {
        if self.out.finish_unsent()? {
            self.lines_written += 1;
        }
        Ok(())
    }
}

/// A cloneable handle that serializes writes to one underlying writer.
///
/// Every `write_atomic` holds a single lock until the whole payload is written,
/// so at most one payload is in flight and each payload lands contiguously. A
/// writer that fails after taking part of a payload does not break this: the
/// sink keeps the remainder and sends it before anything else. Payloads
/// from different handles are ordered by lock acquisition, not by when their
/// producers called `write`.
///
/// `shutdown` waits for the in-flight write (by taking the same lock), flushes
/// the writer and rejects later writes with `Error::SinkClosed`. The writer is
/// never closed or dropped by shutdown; recover it with `into_inner` once every
/// handle but one is gone.
///
/// `SharedSink` is also a `std::io::Write` where each `write` call is one
/// atomic payload, so it can stand in for a lock-guarded writer on its own.
///
/// ```rust
/// use linestream::{LineWriter, SharedSink};
/// use std::io::Write;
///
/// let sink = SharedSink::new(Vec::new());
/// let mut first = LineWriter::new(sink.clone());
/// let mut second = LineWriter::new(sink.clone());
///
/// write!(first, "This is first")?;
/// write!(second, "This is second")?;
/// writeln!(first, " writer")?;
/// writeln!(second, " writer")?;
/// first.close()?;
/// second.close()?;
/// drop((first, second));
///
/// let out = sink.into_inner().unwrap();
/// assert_eq!(out, b"This is first writer\nThis is second writer\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SharedSink<W> {
    state: Arc<Mutex<SinkState<W>>>,
}

impl<W: Write> SharedSink<W> {
    /// Creates a new `SharedSink` owning `writer`. Pass `&mut W` to keep
    /// ownership with the caller.
    pub fn new(writer: W) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                out: Custody::new(writer),
                closed: false,
                lines_written: 0,
            })),
        }
    }

    /// Writes `payload` as one uninterrupted unit.
    ///
    /// `Error::PartialWrite` means the sink took custody of the payload and
    /// will finish it ahead of the next one; any other error means none of it
    /// was written.
    pub fn write_atomic(&self, payload: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::SinkClosed);
        }
        state.write_payload(payload)?;
        trace!(len = payload.len(), "wrote payload to shared sink");
        Ok(())
    }

    /// Waits for any in-flight write, completes a partially written payload,
    /// flushes the writer and rejects all later writes. Calling it again is a
    /// no-op.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        debug!(
            lines_written = state.lines_written,
            handles = Arc::strong_count(&self.state),
            unsent = state.out.unsent_len(),
            "shutting down shared sink"
        );
        state.finish_unsent()?;
        state.out.writer.flush()?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of payloads written so far.
    pub fn lines_written(&self) -> u64 {
        self.lock().lines_written
    }

    /// Number of live handles to this sink, this one included.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    /// Returns the underlying writer if this is the last handle. The unsent
    /// rest of a partially written payload is discarded; `shutdown` first to
    /// complete it.
    pub fn into_inner(self) -> std::result::Result<W, Self> {
        match Arc::try_unwrap(self.state) {
            Ok(state) => Ok(recover(state.into_inner(), "shared sink").out.into_inner()),
            Err(state) => Err(Self { state }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState<W>> {
        recover(self.state.lock(), "shared sink")
    }
}

impl<W> Clone for SharedSink<W> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<W> fmt::Debug for SharedSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSink")
            .field("handles", &Arc::strong_count(&self.state))
            .finish_non_exhaustive()
    }
}

impl<W: Write> LineSink for SharedSink<W> {
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.write_atomic(line)
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.lock();
        if !state.closed {
            state.finish_unsent()?;
            state.out.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SharedSink<W> {
    /// A payload the sink took custody of counts as written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_atomic(buf) {
            Ok(()) | Err(Error::PartialWrite { .. }) => Ok(buf.len()),
            Err(err) => Err(err.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        LineSink::flush(self)?;
        Ok(())
    }
}
