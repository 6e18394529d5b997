//! Several worker threads report progress to stdout through one `WriterGroup`.
//!
//! Each worker writes its lines in fragments; the output never mixes two
//! workers inside one line. Run with `RUST_LOG=linestream=debug` to see the
//! library's own events on stderr.

use linestream::{LineConfig, Result, WriterGroup};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let group = WriterGroup::with_config(io::stdout(), LineConfig::default());

    thread::scope(|scope| {
        let workers: Vec<_> = (0..4u64)
            .map(|worker| {
                let mut out = group.create_writer();
                scope.spawn(move || -> io::Result<()> {
                    for step in 0..5 {
                        write!(out, "[worker {worker}] ")?;
                        thread::sleep(Duration::from_millis(3 * (worker + 1)));
                        write!(out, "step {step}/5 ")?;
                        writeln!(out, "done")?;
                    }
                    // Left for the group to flush on close.
                    write!(out, "[worker {worker}] finished")
                })
            })
            .collect();

        for (worker, handle) in workers.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(worker, error = %err, "worker failed to write"),
                Err(_) => tracing::warn!(worker, "worker panicked"),
            }
        }
    });

    group.close()
}
