//! Per-writer line configuration.

use crate::error::{Error, Result};

/// Default line terminator.
pub const DEFAULT_TERMINATOR: u8 = b'\n';

/// Options applied to a `LineWriter` (or every writer of a `WriterGroup`)
/// at construction time.
///
/// The destination is not part of the config: it is the sink value passed to
/// the writer's constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LineConfig {
    /// Byte that ends a line. Defaults to `\n`.
    pub terminator: u8,
    /// When set, emitted lines exclude the terminator even though the
    /// terminator still triggers the flush.
    pub omit_terminator: bool,
}

impl LineConfig {
    /// Creates a config with `\n` terminators kept in the output.
    pub const fn new() -> Self {
        Self {
            terminator: DEFAULT_TERMINATOR,
            omit_terminator: false,
        }
    }

    /// Uses `terminator` instead of `\n`.
    pub const fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    /// Uses a character terminator. Only single-byte (ASCII) characters can
    /// be matched in a byte stream; anything wider is rejected rather than
    /// truncated.
    pub fn with_terminator_char(self, terminator: char) -> Result<Self> {
        if !terminator.is_ascii() {
            return Err(Error::invalid_config(format!(
                "terminator {terminator:?} is not a single-byte character"
            )));
        }
        Ok(self.with_terminator(terminator as u8))
    }

    /// Drops the terminator from emitted lines.
    pub const fn omit_terminator(mut self) -> Self {
        self.omit_terminator = true;
        self
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self::new()
    }
}
