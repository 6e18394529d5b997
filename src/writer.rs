//! The producer-facing line writer.

use crate::buffer::LineBuffer;
use crate::config::LineConfig;
use crate::error::{Error, Result};
use crate::policy::{MemoryPolicy, NoOpPolicy, ReclamationInfo};
use crate::sink::{FnSink, LineSink, WriteSink};
use std::io::{self, Write};
use tracing::{debug, trace};

/// A single-producer writer that forwards only complete lines to its sink.
///
/// Bytes are buffered until the configured terminator arrives; each completed
/// line then goes to the sink in one `write_line` call. `close` is the only
/// operation that emits a trailing line without a terminator in the input.
///
/// The writer is generic over its `LineSink`:
/// 1. `to_writer()` - Flush straight into an owned `std::io::Write`
/// 2. `from_fn()` - Hand each line to a callback
/// 3. `new()` / `with_config()` - Any sink, typically a cloned `SharedSink`
///
/// When a sink write fails the pending line is kept, so nothing is lost and a
/// retry (another `write`, or `close`) re-sends it. A line the sink took
/// custody of (`Error::line_accepted`) is never re-sent.
pub struct LineWriter<S: LineSink, P: MemoryPolicy = NoOpPolicy> {
    buffer: LineBuffer,
    sink: S,
    config: LineConfig,
    policy: P,
    closed: bool,
}

impl<S: LineSink> LineWriter<S> {
    /// Creates a writer with the default config (`\n`, terminator kept).
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, LineConfig::default())
    }

    /// Creates a writer with an explicit config.
    pub fn with_config(sink: S, config: LineConfig) -> Self {
        Self {
            buffer: LineBuffer::new(config),
            sink,
            config,
            policy: NoOpPolicy,
            closed: false,
        }
    }
}

impl<W: Write> LineWriter<WriteSink<W>> {
    /// Creates a writer that flushes lines into `writer`.
    pub fn to_writer(writer: W) -> Self {
        Self::new(WriteSink::new(writer))
    }
}

impl<F> LineWriter<FnSink<F>>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    /// Creates a writer that hands each completed line to `callback`.
    pub fn from_fn(callback: F) -> Self {
        Self::new(FnSink::new(callback))
    }
}

impl<S: LineSink, P: MemoryPolicy> LineWriter<S, P> {
    /// Replaces the memory reclamation policy.
    pub fn with_policy<Q: MemoryPolicy>(self, policy: Q) -> LineWriter<S, Q> {
        LineWriter {
            buffer: self.buffer,
            sink: self.sink,
            config: self.config,
            policy,
            closed: self.closed,
        }
    }

    /// Buffers `bytes`, flushing every line they complete.
    ///
    /// Returns `bytes.len()` on success. On a sink failure returns
    /// `Error::Flush`; see `Error::consumed` for where to resume.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::WriterClosed);
        }
        let emitted = self.buffer.lines_emitted();
        let sink = &mut self.sink;
        let result = self.buffer.append(bytes, |line| sink.write_line(line));
        if self.buffer.lines_emitted() != emitted {
            self.reclaim();
        }
        result.map(|()| bytes.len())
    }

    /// Flushes any residual bytes as a final line and closes the writer.
    ///
    /// Emits nothing when no bytes are pending. Fails with
    /// `Error::WriterClosed` if the writer was already closed. If the final
    /// line cannot be delivered the writer stays open with its bytes still
    /// pending; a failure flushing the sink afterwards is reported but the
    /// writer is closed. Closing releases the line buffer's memory.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::WriterClosed);
        }
        self.finish()
    }

    /// Closes the writer unless it is closed already.
    pub(crate) fn close_if_open(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let residual = self.buffer.len();
        let sink = &mut self.sink;
        let delivered = match self.buffer.force_flush(|line| sink.write_line(line)) {
            Err(err) if !err.line_accepted() => return Err(err),
            delivered => delivered,
        };
        self.closed = true;
        self.buffer.shrink(0);
        trace!(residual, "line writer closed");
        delivered?;
        self.sink.flush()
    }

    fn reclaim(&mut self) {
        let last_line_len = self.buffer.last_line_len();
        let capacity_before = self.buffer.capacity();
        if let Some(reason) = self.policy.should_shrink(last_line_len, capacity_before) {
            self.buffer.shrink(self.policy.retained_capacity());
            let info = ReclamationInfo {
                reason,
                last_line_len,
                capacity_before,
                capacity_after: self.buffer.capacity(),
            };
            debug!(
                ?reason,
                capacity_before,
                capacity_after = info.capacity_after,
                "reclaimed line buffer memory"
            );
            self.policy.on_reclaim(&info);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes of the current, unterminated line.
    pub fn buffered(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the writer, returning the sink. Pending bytes are discarded;
    /// call `close` first to keep them.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: LineSink, P: MemoryPolicy> Write for LineWriter<S, P> {
    /// Follows the `std::io::Write` partial-write contract: a failed flush
    /// after some input was consumed reports `Ok(consumed)`, so `write_all`
    /// retries from the failing terminator.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match LineWriter::write(self, buf) {
            Ok(n) => Ok(n),
            Err(Error::Flush { consumed, .. }) if consumed > 0 => Ok(consumed),
            Err(err) => Err(err.into()),
        }
    }

    /// Flushes the sink. Pending bytes stay buffered until a terminator or
    /// `close`.
    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(Error::WriterClosed.into());
        }
        self.sink.flush()?;
        Ok(())
    }
}
