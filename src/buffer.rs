//! The per-producer accumulation state machine.

use crate::config::LineConfig;
use crate::error::{Error, Result};

/// Accumulates the bytes of one producer's current line until a terminator
/// arrives.
///
/// The accumulation region never holds a terminator byte: each occurrence in
/// the input completes the pending line, which is handed to the `emit`
/// callback before the terminator counts as consumed. The buffer itself never
/// fails; only `emit` can.
///
/// A failed `emit` leaves the pending line in place (without the terminator),
/// so a later attempt re-emits the same bytes. The exception is a failure for
/// which `Error::line_accepted` holds: the sink already owns the line, so it is
/// dropped from the buffer and counted as emitted.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
    terminator: u8,
    omit_terminator: bool,
    lines_emitted: u64,
    last_line_len: usize,
}

impl LineBuffer {
    /// Creates an empty buffer using the terminator policy from `config`.
    pub fn new(config: LineConfig) -> Self {
        Self {
            pending: Vec::new(),
            terminator: config.terminator,
            omit_terminator: config.omit_terminator,
            lines_emitted: 0,
            last_line_len: 0,
        }
    }

    /// Appends `input`, emitting one line per terminator found.
    ///
    /// Bytes after the last terminator stay pending. If `emit` fails, the
    /// error is wrapped in `Error::Flush` carrying how many input bytes were
    /// consumed; the terminator at that offset and everything after it were
    /// not, unless the sink accepted the line, in which case its terminator
    /// is counted as consumed too.
    pub fn append<F>(&mut self, input: &[u8], mut emit: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let mut consumed = 0;
        while let Some(offset) = input[consumed..]
            .iter()
            .position(|&b| b == self.terminator)
        {
            let end = consumed + offset;
            self.pending.extend_from_slice(&input[consumed..end]);
            consumed = end;
            if let Err(source) = self.emit_pending(&mut emit) {
                if source.line_accepted() {
                    consumed += 1;
                }
                return Err(Error::flush(consumed, source));
            }
            consumed += 1;
        }
        self.pending.extend_from_slice(&input[consumed..]);
        Ok(())
    }

    /// Emits the pending bytes as a final line even though no terminator was
    /// seen. Returns `Ok(false)` without calling `emit` when nothing is
    /// pending.
    pub fn force_flush<F>(&mut self, mut emit: F) -> Result<bool>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        if self.pending.is_empty() {
            return Ok(false);
        }
        self.emit_pending(&mut emit)?;
        Ok(true)
    }

    fn emit_pending<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        let line_len = self.pending.len();
        if !self.omit_terminator {
            self.pending.push(self.terminator);
        }
        let result = emit(&self.pending);
        match result {
            Err(ref err) if !err.line_accepted() => self.pending.truncate(line_len),
            _ => {
                self.pending.clear();
                self.lines_emitted += 1;
                self.last_line_len = line_len;
            }
        }
        result
    }

    /// Returns true when no unterminated bytes are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of unterminated bytes pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// The unterminated bytes pending.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pending
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    /// Allocated capacity of the accumulation region.
    pub fn capacity(&self) -> usize {
        self.pending.capacity()
    }

    /// Total lines emitted successfully so far.
    pub fn lines_emitted(&self) -> u64 {
        self.lines_emitted
    }

    /// Length of the most recently emitted line, terminator excluded.
    pub fn last_line_len(&self) -> usize {
        self.last_line_len
    }

    /// Releases spare capacity down to `min_capacity`, keeping pending bytes.
    pub fn shrink(&mut self, min_capacity: usize) {
        self.pending.shrink_to(self.pending.len().max(min_capacity));
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(LineConfig::default())
    }
}
