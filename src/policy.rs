//! Memory reclamation policies for `LineWriter`.
//!
//! A writer's accumulation region keeps whatever capacity its longest line
//! needed. A `MemoryPolicy` decides when that capacity should be handed back
//! after a burst of long lines has passed.

/// Reason for a reclamation (shrink) action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclamationReason {
    /// Capacity stayed above the limit through a run of short lines.
    SizeThreshold,
}

/// Information about a reclamation event.
#[derive(Debug, Clone, Copy)]
pub struct ReclamationInfo {
    pub reason: ReclamationReason,
    pub last_line_len: usize,
    pub capacity_before: usize,
    pub capacity_after: usize,
}

/// A stateful policy for when to shrink a writer's line buffer.
pub trait MemoryPolicy {
    /// Called after a write or close that emitted at least one line.
    ///
    /// Arguments
    /// - `last_line_len`: Length of the most recent line, terminator excluded.
    /// - `current_capacity`: Allocated capacity of the line buffer.
    ///
    /// Returns
    /// - `Some(ReclamationReason)` if the buffer should shrink, otherwise `None`.
    fn should_shrink(
        &mut self,
        last_line_len: usize,
        current_capacity: usize,
    ) -> Option<ReclamationReason>;

    /// Optional hook called after a shrink occurs.
    #[inline(always)]
    fn on_reclaim(&mut self, _info: &ReclamationInfo) {}

    /// Capacity to keep when shrinking.
    fn retained_capacity(&self) -> usize {
        0
    }
}

/// A zero-cost policy that never shrinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPolicy;

impl MemoryPolicy for NoOpPolicy {
    #[inline(always)]
    fn should_shrink(
        &mut self,
        _last_line_len: usize,
        _current_capacity: usize,
    ) -> Option<ReclamationReason> {
        None
    }
}

/// Shrinks the buffer once it has grown past `capacity_limit` and then seen
/// `lines_to_wait` consecutive lines shorter than `short_line_len`.
#[derive(Debug, Clone, Copy)]
pub struct SizeThresholdPolicy {
    pub capacity_limit: usize,
    pub short_line_len: usize,
    pub lines_to_wait: u32,
    /// Capacity kept after shrinking.
    pub retain: usize,
    short_lines: u32,
}

impl SizeThresholdPolicy {
    pub fn new(capacity_limit: usize, short_line_len: usize, lines_to_wait: u32) -> Self {
        Self {
            capacity_limit,
            short_line_len,
            lines_to_wait,
            retain: short_line_len,
            short_lines: 0,
        }
    }
}

impl Default for SizeThresholdPolicy {
    fn default() -> Self {
        Self::new(64 << 10, 1 << 10, 16) // 64 KiB limit, 1 KiB short line, 16 lines
    }
}

impl MemoryPolicy for SizeThresholdPolicy {
    fn should_shrink(
        &mut self,
        last_line_len: usize,
        current_capacity: usize,
    ) -> Option<ReclamationReason> {
        if current_capacity <= self.capacity_limit || last_line_len >= self.short_line_len {
            self.short_lines = 0;
            return None;
        }

        self.short_lines = self.short_lines.saturating_add(1);
        if self.short_lines >= self.lines_to_wait {
            self.short_lines = 0;
            return Some(ReclamationReason::SizeThreshold);
        }
        None
    }

    fn retained_capacity(&self) -> usize {
        self.retain
    }
}
