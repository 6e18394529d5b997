use std::io::{Error, ErrorKind, Result, Write};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

pub struct FaultyWriter<W: Write> {
    inner: W,
    mode: FaultMode,
    counter: usize,
}

#[allow(dead_code)]
pub enum FaultMode {
    /// Every write fails with `BrokenPipe`.
    AlwaysFail,
    /// The first `n` write calls fail, later ones pass through.
    FailFirst(usize),
    /// Each call accepts one byte and yields the thread, inviting other
    /// producers to interleave if nothing serializes them.
    OneByteYielding,
    /// Flush fails; writes pass through.
    FailFlush,
    /// The first call accepts at most `n` bytes, the second fails, later
    /// calls pass through.
    AcceptThenFail(usize),
    /// Each call accepts one byte and sleeps for `per_byte`. The first call
    /// sends on `started`.
    Slow {
        started: Sender<()>,
        per_byte: Duration,
    },
    /// Call number `n` panics; the others pass through.
    PanicOn(usize),
}

impl<W: Write> FaultyWriter<W> {
    pub fn new(inner: W, mode: FaultMode) -> Self {
        Self {
            inner,
            mode,
            counter: 0,
        }
    }
}

impl<W: Write> Write for FaultyWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.counter += 1;
        match self.mode {
            FaultMode::AlwaysFail => {
                Err(Error::new(ErrorKind::BrokenPipe, "Simulated I/O error"))
            }
            FaultMode::FailFirst(n) if self.counter <= n => {
                Err(Error::new(ErrorKind::BrokenPipe, "Simulated I/O error"))
            }
            FaultMode::OneByteYielding if !buf.is_empty() => {
                let n = self.inner.write(&buf[..1])?;
                thread::yield_now();
                Ok(n)
            }
            FaultMode::AcceptThenFail(n) if self.counter == 1 => {
                self.inner.write(&buf[..buf.len().min(n)])
            }
            FaultMode::AcceptThenFail(_) if self.counter == 2 => {
                Err(Error::new(ErrorKind::TimedOut, "Simulated stall"))
            }
            FaultMode::Slow {
                ref started,
                per_byte,
            } if !buf.is_empty() => {
                if self.counter == 1 {
                    let _ = started.send(());
                }
                let n = self.inner.write(&buf[..1])?;
                thread::sleep(per_byte);
                Ok(n)
            }
            FaultMode::PanicOn(n) if self.counter == n => panic!("Simulated writer panic"),
            _ => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.mode {
            FaultMode::FailFlush => Err(Error::other("Simulated flush error")),
            _ => self.inner.flush(),
        }
    }
}
