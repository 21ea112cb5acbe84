//! I/O wrappers for reporting data transfer.
//!
//! [`BarReader`] and [`BarWriter`] wrap any [`Read`] or [`Write`] and advance
//! their [`Bar`] by the number of bytes that passed through, keeping the
//! bar's current message. Zero-length transfers are not reported.
//!
//! If the bar's manager has already stopped listening, the transfer still
//! succeeds and only the report is dropped.

use std::io::{self, Read, Write};

use tracing::trace;

use crate::Bar;

fn report(bar: &mut Bar, bytes: usize) {
    if bytes == 0 {
        return;
    }
    let message = bar.message().to_owned();
    if let Err(err) = bar.advance(bytes as u64, &message) {
        trace!(bar = bar.name(), error = %err, "dropped transfer report");
    }
}

/// A wrapper around [`Read`] that advances a [`Bar`] by the bytes read.
#[derive(Debug)]
pub struct BarReader<R> {
    inner: R,
    bar: Bar,
}

impl<R> BarReader<R> {
    /// Creates a new `BarReader` wrapping `inner`.
    pub const fn new(inner: R, bar: Bar) -> Self {
        Self { inner, bar }
    }

    /// Returns the bar being advanced.
    pub const fn bar(&self) -> &Bar {
        &self.bar
    }

    /// Returns the bar mutably, e.g. to change its message between reads.
    pub const fn bar_mut(&mut self) -> &mut Bar {
        &mut self.bar
    }

    /// Unwraps the reader and its bar.
    pub fn into_parts(self) -> (R, Bar) {
        (self.inner, self.bar)
    }
}

impl<R: Read> Read for BarReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        report(&mut self.bar, n);
        Ok(n)
    }
}

/// A wrapper around [`Write`] that advances a [`Bar`] by the bytes written.
#[derive(Debug)]
pub struct BarWriter<W> {
    inner: W,
    bar: Bar,
}

impl<W> BarWriter<W> {
    /// Creates a new `BarWriter` wrapping `inner`.
    pub const fn new(inner: W, bar: Bar) -> Self {
        Self { inner, bar }
    }

    /// Returns the bar being advanced.
    pub const fn bar(&self) -> &Bar {
        &self.bar
    }

    /// Returns the bar mutably.
    pub const fn bar_mut(&mut self) -> &mut Bar {
        &mut self.bar
    }

    /// Unwraps the writer and its bar.
    pub fn into_parts(self) -> (W, Bar) {
        (self.inner, self.bar)
    }
}

impl<W: Write> Write for BarWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        report(&mut self.bar, n);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Cursor, Read as _, Write as _},
        time::Duration,
    };

    use crate::{
        Bar, BarManager, BarStatus, Layout, MemoryTerminal,
        io::{BarReader, BarWriter},
    };

    /// Reader Tracking
    /// Bytes read are counted and a full read completes the bar.
    #[test]
    fn test_io_reader() {
        let data = vec![0u8; 100];
        let bar =
            Bar::single_with_terminal(100u64, "read", Layout::SingleLine, MemoryTerminal::new());
        let mut reader = BarReader::new(Cursor::new(&data), bar);

        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(reader.bar().current(), 10);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(reader.bar().current(), 100);
        assert_eq!(reader.bar().status(), BarStatus::Completed);
    }

    /// Writer Tracking
    /// Bytes written are counted and the message survives each report.
    #[test]
    fn test_io_writer() {
        let bar =
            Bar::single_with_terminal(50u64, "write", Layout::SingleLine, MemoryTerminal::new());
        let mut writer = BarWriter::new(Vec::new(), bar);

        writer.bar_mut().advance(0, "uploading").unwrap();
        writer.write_all(&[1, 2, 3, 4, 5]).unwrap();

        let (written, bar) = writer.into_parts();
        assert_eq!(written.len(), 5);
        assert_eq!(bar.current(), 5);
        assert!(bar.message().starts_with("uploading"));
    }

    /// Closed Manager
    /// Transfers keep working after the manager has stopped listening.
    #[test]
    fn test_io_after_close() {
        let mut manager = BarManager::builder(Duration::from_millis(20))
            .terminal(MemoryTerminal::new())
            .build();
        let mut other = manager.create(1u64, "other");
        let bar = manager.create(4u64, "copy");

        other.advance(1, "").unwrap();
        drop(other);
        let mut writer = BarWriter::new(Vec::new(), bar);
        let unfinished = manager.show_and_wait();
        assert_eq!(unfinished, ["copy"]);

        writer.write_all(b"data").unwrap();
        assert_eq!(writer.bar().current(), 4);
    }
}
