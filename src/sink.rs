//! Flush destinations for completed lines.

use crate::error::{Error, Result};
use std::io::{self, Write};
use tracing::{trace, warn};

//--- LineSink Trait and Implementations ---

/// A destination that accepts one completed line at a time.
///
/// Purpose: Separate where lines go (a writer, a shared sink, a callback) from
/// how they are assembled. Implementations are small strategy objects composed
/// into `LineWriter`.
pub trait LineSink {
    /// Delivers one completed line, terminator included unless the writer
    /// omits it. A line must reach the destination as a single unit.
    fn write_line(&mut self, line: &[u8]) -> Result<()>;

    /// Flushes any buffering inside the destination. Never closes it.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        (**self).write_line(line)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<S: LineSink + ?Sized> LineSink for Box<S> {
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        (**self).write_line(line)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// A writer plus the unsent rest of a payload it accepted only in part.
///
/// Once a payload is partly written nothing else may reach the writer until
/// the remainder has gone out, so a payload is never split by another one or
/// sent twice.
#[derive(Debug)]
pub(crate) struct Custody<W> {
    pub(crate) writer: W,
    unsent: Vec<u8>,
}

impl<W: Write> Custody<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            unsent: Vec::new(),
        }
    }

    pub(crate) fn unsent_len(&self) -> usize {
        self.unsent.len()
    }

    /// Writes all of `payload`.
    ///
    /// If the writer fails after taking part of it, the rest is held and
    /// `Error::PartialWrite` is returned; the caller must not resend it. Any
    /// other error means none of the payload was written.
    pub(crate) fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < payload.len() {
            match self.writer.write(&payload[written..]) {
                Ok(0) => return Err(self.hold(payload, written, write_zero())),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.hold(payload, written, e)),
            }
        }
        Ok(())
    }

    fn hold(&mut self, payload: &[u8], written: usize, source: io::Error) -> Error {
        if written == 0 {
            return Error::Io(source);
        }
        self.unsent.extend_from_slice(&payload[written..]);
        warn!(
            written,
            unsent = self.unsent.len(),
            error = %source,
            "writer failed part way through a payload; holding the remainder"
        );
        Error::PartialWrite { written, source }
    }

    /// Sends the held remainder, if any. Returns `Ok(true)` when a payload
    /// was completed.
    pub(crate) fn finish_unsent(&mut self) -> io::Result<bool> {
        if self.unsent.is_empty() {
            return Ok(false);
        }
        while !self.unsent.is_empty() {
            match self.writer.write(&self.unsent) {
                Ok(0) => return Err(write_zero()),
                Ok(n) => {
                    self.unsent.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        trace!("completed partially written payload");
        Ok(true)
    }

    pub(crate) fn into_inner(self) -> W {
        self.writer
    }
}

fn write_zero() -> io::Error {
    io::Error::new(io::ErrorKind::WriteZero, "failed to write whole payload")
}

/// Writes each line straight to a `std::io::Write`.
///
/// When to use: A single standalone writer owns its destination. To share a
/// destination between writers, wrap it in `SharedSink` instead.
///
/// A writer that fails after taking part of a line reports
/// `Error::PartialWrite`; the rest of that line goes out before the next one.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    out: Custody<W>,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Custody::new(writer),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out.writer
    }

    /// Consumes the sink, returning the underlying writer. The unsent rest of
    /// a partially written line is discarded.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> LineSink for WriteSink<W> {
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.out.finish_unsent()?;
        self.out.write_payload(line)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.finish_unsent()?;
        self.out.writer.flush()?;
        Ok(())
    }
}

/// Hands each line to a callback in place of a sink write.
pub struct FnSink<F> {
    callback: F,
}

impl<F> FnSink<F>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> LineSink for FnSink<F>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        (self.callback)(line)?;
        Ok(())
    }
}

//--- Sink Adapters ---

/// A composable adapter that enforces a maximum line length for any sink.
///
/// Failure semantics: Returns `Error::LineTooLong` (length includes the
/// terminator when it is emitted) and leaves the line pending in the writer.
pub struct BoundedSink<S: LineSink> {
    inner: S,
    max_len: usize,
}

impl<S: LineSink> BoundedSink<S> {
    pub fn new(inner: S, max_len: usize) -> Self {
        Self { inner, max_len }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: LineSink> LineSink for BoundedSink<S> {
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        if line.len() > self.max_len {
            return Err(Error::LineTooLong {
                len: line.len(),
                limit: self.max_len,
            });
        }
        self.inner.write_line(line)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

/// An adapter that allows observing lines on the way to a sink without
/// copying or mutating them.
///
/// Callback timing: Invoked exactly once per line, before delegating to the
/// inner sink.
pub struct ObserverSink<S: LineSink, C: FnMut(&[u8])> {
    inner: S,
    callback: C,
}

impl<S: LineSink, C: FnMut(&[u8])> ObserverSink<S, C> {
    pub fn new(inner: S, callback: C) -> Self {
        Self { inner, callback }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: LineSink, C: FnMut(&[u8])> LineSink for ObserverSink<S, C> {
    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        (self.callback)(line);
        self.inner.write_line(line)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

//--- Fluent Extension Trait ---

/// Extension methods for sinks to enable fluent composition without importing
/// adapter types.
pub trait LineSinkExt: LineSink + Sized {
    /// Reject lines longer than `max` bytes.
    fn bounded(self, max: usize) -> BoundedSink<Self> {
        BoundedSink::new(self, max)
    }

    /// Observe lines without copying. Useful for metrics/logging.
    fn observed<C: FnMut(&[u8])>(self, callback: C) -> ObserverSink<Self, C> {
        ObserverSink::new(self, callback)
    }
}

impl<T: LineSink> LineSinkExt for T {}
