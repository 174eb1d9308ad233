//! Byte-counting output sink.

use std::fmt;
use std::io::{self, Write};

/// Callback invoked with the cumulative number of bytes written
pub type ProgressFn = Box<dyn FnMut(u64)>;

/// A [`Write`] wrapper that counts bytes and reports progress.
///
/// The callback runs after every write that moved at least one byte, with the
/// new cumulative total. Totals are monotonically non-decreasing.
pub struct CountingSink<W> {
    inner: W,
    written: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> CountingSink<W> {
    /// Wraps a sink without a progress callback
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            progress: None,
        }
    }

    /// Wraps a sink and reports progress to `progress`
    pub fn with_progress(inner: W, progress: impl FnMut(u64) + 'static) -> Self {
        Self {
            inner,
            written: 0,
            progress: Some(Box::new(progress)),
        }
    }

    /// Total bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the wrapped sink
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if n > 0 {
            self.written += n as u64;
            if let Some(progress) = self.progress.as_mut() {
                progress(self.written);
            }
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W> fmt::Debug for CountingSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingSink")
            .field("written", &self.written)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_counts_without_callback() {
        let mut sink = CountingSink::new(Vec::new());
        sink.write_all(b"hello").unwrap();
        sink.write_all(b"").unwrap();
        sink.write_all(b" world").unwrap();
        assert_eq!(sink.written(), 11);
        assert_eq!(sink.into_inner(), b"hello world");
    }

    #[test]
    fn test_progress_is_cumulative() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&seen);
        let mut sink =
            CountingSink::with_progress(Vec::new(), move |n| recorder.borrow_mut().push(n));

        sink.write_all(b"ab").unwrap();
        sink.write_all(b"").unwrap();
        sink.write_all(b"cde").unwrap();

        assert_eq!(*seen.borrow(), vec![2, 5]);
    }
}
