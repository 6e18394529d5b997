//! # LineStream (v0.1.0)
//!
//! Line-atomic buffered writers for many producers sharing one destination.
//!
//! ## Overview
//!
//! Producers rarely write whole lines in one call: a line may arrive as
//! `"AB"`, then `"CD\n"`. When several producers share a file, socket or
//! buffer, those fragments interleave and tear each other's lines. `linestream`
//! gives every producer its own line buffer and only ever forwards complete,
//! terminated lines, each as one indivisible write to the shared destination.
//!
//! ## Key Features
//!
//! * **Line Atomicity**: A line reaches the sink in one write or not at all
//! * **No Tearing**: Writes from all writers of a `SharedSink` are serialized
//! * **Configurable Lines**: Any single-byte terminator; optionally omitted from output
//! * **Composable Sinks**: Writers, callbacks, bounded and observed adapters
//! * **Group Lifecycle**: `WriterGroup` closes every writer it created, then drains the sink
//!
//! ## Quick Start
//!
//! ```rust
//! use linestream::*;
//! use std::io::Write;
//!
//! fn main() -> Result<()> {
//!     let group = WriterGroup::new(Vec::new());
//!     let sink = group.sink().clone();
//!
//!     std::thread::scope(|scope| {
//!         for name in ["alpha", "beta"] {
//!             let mut writer = group.create_writer();
//!             scope.spawn(move || {
//!                 for i in 0..3 {
//!                     // Fragments of one line never interleave with other writers.
//!                     write!(writer, "{name} ").unwrap();
//!                     writeln!(writer, "line {i}").unwrap();
//!                 }
//!             });
//!         }
//!     });
//!
//!     group.close()?;
//!     assert_eq!(sink.lines_written(), 6);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **`LineBuffer`**: Per-producer accumulator that emits a line at each terminator
//! * **`LineSink`**: Where completed lines go (`WriteSink`, `FnSink`, `SharedSink`, adapters)
//! * **`SharedSink`**: Lock-guarded destination serializing lines from every writer
//! * **`LineWriter`**: A `LineBuffer` bound to a sink; the producer-facing write/close contract
//! * **`WriterGroup`**: Creates writers over one `SharedSink` and closes them together
//!
//! A failed sink write never discards the pending line: it stays buffered and
//! the error reports how much of the input was consumed.

pub mod buffer;
pub mod config;
pub mod error;
pub mod group;
pub mod policy;
pub mod shared;
pub mod sink;
pub mod writer;

// Re-export the main public API for user convenience.
pub use buffer::LineBuffer;
pub use config::{LineConfig, DEFAULT_TERMINATOR};
pub use error::{Error, Result};
pub use group::{GroupWriter, WriterGroup};
pub use policy::{MemoryPolicy, NoOpPolicy, SizeThresholdPolicy};
pub use shared::SharedSink;
pub use sink::{BoundedSink, FnSink, LineSink, LineSinkExt, ObserverSink, WriteSink};
pub use writer::LineWriter;
