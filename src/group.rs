//! Writers that share one sink and close together.

use crate::config::LineConfig;
use crate::error::{Error, Result};
use crate::shared::{recover, SharedSink};
use crate::writer::LineWriter;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

type Tracked<W> = Arc<Mutex<LineWriter<SharedSink<W>>>>;

fn lock<W: Write>(writer: &Tracked<W>) -> MutexGuard<'_, LineWriter<SharedSink<W>>> {
    recover(writer.lock(), "group writer")
}

/// A writer that is closed and not mid-call can be forgotten by the group.
fn is_released<W: Write>(writer: &Tracked<W>) -> bool {
    matches!(writer.try_lock(), Ok(writer) if writer.is_closed())
}

/// A factory for line writers bound to one shared destination.
///
/// Every writer created by the group flushes through the same `SharedSink`, so
/// lines from different writers never tear. `close` sweeps every writer the
/// group created, including ones whose handles are still held by producers,
/// then shuts the sink down. Writers closed by their producers are dropped
/// from the group the next time it creates a writer.
///
/// ```rust
/// use linestream::WriterGroup;
/// use std::io::Write;
///
/// let mut out = Vec::new();
/// {
///     let group = WriterGroup::new(&mut out);
///     let mut first = group.create_writer();
///     let mut second = group.create_writer();
///
///     write!(first, "This is first")?;
///     write!(second, "This is second")?;
///     write!(first, " writer")?;
///     write!(second, " writer")?;
///
///     group.close()?;
/// }
/// assert_eq!(out, b"This is first writer\nThis is second writer\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct WriterGroup<W: Write> {
    sink: SharedSink<W>,
    config: LineConfig,
    writers: Mutex<Vec<(usize, Tracked<W>)>>,
    next_id: AtomicUsize,
}

impl<W: Write> WriterGroup<W> {
    /// Creates a group writing to `writer` with the default line config.
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, LineConfig::default())
    }

    /// Creates a group whose writers all use `config`.
    pub fn with_config(writer: W, config: LineConfig) -> Self {
        Self {
            sink: SharedSink::new(writer),
            config,
            writers: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Creates a writer using the group's config.
    pub fn create_writer(&self) -> GroupWriter<W> {
        self.create_writer_with_config(self.config)
    }

    /// Creates a writer with its own config that still shares the group sink.
    pub fn create_writer_with_config(&self, config: LineConfig) -> GroupWriter<W> {
        let writer = Arc::new(Mutex::new(LineWriter::with_config(
            self.sink.clone(),
            config,
        )));
        let mut writers = recover(self.writers.lock(), "group writer registry");
        writers.retain(|(_, tracked)| !is_released(tracked));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        writers.push((id, Arc::clone(&writer)));
        debug!(writer = id, "created group writer");
        GroupWriter { inner: writer, id }
    }

    /// Number of writers the group still tracks.
    pub fn len(&self) -> usize {
        recover(self.writers.lock(), "group writer registry").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sink shared by every writer in the group.
    pub fn sink(&self) -> &SharedSink<W> {
        &self.sink
    }

    /// Closes every writer the group created, then shuts the sink down.
    ///
    /// Writers already closed by their producers are skipped. Every failure,
    /// from any writer or from the sink shutdown, is collected into
    /// `Error::GroupClose`; none stop the sweep early.
    pub fn close(self) -> Result<()> {
        let writers = recover(self.writers.into_inner(), "group writer registry");

        let mut errors = Vec::new();
        for (id, writer) in &writers {
            if let Err(err) = lock(writer).close_if_open() {
                warn!(writer = *id, error = %err, "failed to close group writer");
                errors.push(err);
            }
        }
        if let Err(err) = self.sink.shutdown() {
            warn!(error = %err, "failed to shut down group sink");
            errors.push(err);
        }

        debug!(
            writers = writers.len(),
            failures = errors.len(),
            "closed writer group"
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::GroupClose(errors))
        }
    }
}

/// A producer's handle to a writer owned by a `WriterGroup`.
///
/// Each handle is meant for one producer; move it to the thread that writes
/// through it. The group keeps its own reference so it can close the writer.
pub struct GroupWriter<W: Write> {
    inner: Tracked<W>,
    id: usize,
}

impl<W: Write> GroupWriter<W> {
    /// Position of this writer in its group's creation order.
    pub fn id(&self) -> usize {
        self.id
    }

    /// See `LineWriter::write`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        lock(&self.inner).write(bytes)
    }

    /// See `LineWriter::close`.
    pub fn close(&mut self) -> Result<()> {
        lock(&self.inner).close()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner).is_closed()
    }

    /// Bytes of the current, unterminated line.
    pub fn buffered(&self) -> Vec<u8> {
        lock(&self.inner).buffered().to_vec()
    }
}

impl<W: Write> Write for GroupWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut *lock(&self.inner), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut *lock(&self.inner))
    }
}
