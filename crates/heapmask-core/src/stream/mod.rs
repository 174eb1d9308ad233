//! Sequential read-and-forward cursor.
//!
//! A [`Cursor`] tees one byte source into one byte sink. Every `read_forward_*`
//! call consumes a field from the source, writes the very same bytes to the
//! sink, and returns the decoded value. The only operation that writes bytes
//! different from the ones it read is [`Cursor::discard_and_mask`], and it
//! always writes exactly as many bytes as it discarded.
//!
//! ## Bounded views
//!
//! [`Cursor::open_bounded`] returns a child cursor over the next `len` source
//! bytes. The child shares the parent's source, sink and identifier size, and
//! any read past its bound fails with [`Error::Truncated`]. The parent's
//! offset advances by `len` as soon as the view is opened; the caller must
//! drain the view exactly.

mod counting;

use crate::error::{Error, Result};
use crate::hprof::IdSize;
use crate::mask::MaskPattern;
use byteorder::{BigEndian, ByteOrder};
use std::io::{self, ErrorKind, Read, Write};

pub use counting::{CountingSink, ProgressFn};

/// Read-and-forward cursor over a source/sink pair
#[derive(Debug)]
pub struct Cursor<R, W> {
    source: R,
    sink: W,
    id_size: Option<IdSize>,
    /// Absolute offset in the source
    offset: u64,
    /// Bytes still readable through this view; `None` when unbounded
    limit: Option<u64>,
}

impl<R: Read, W: Write> Cursor<R, W> {
    /// Creates an unbounded cursor. The identifier size is unset until
    /// [`Cursor::set_id_size`] is called.
    pub fn new(source: R, sink: W) -> Self {
        Self {
            source,
            sink,
            id_size: None,
            offset: 0,
            limit: None,
        }
    }

    /// Fixes the identifier size for this cursor and views opened from it
    pub fn set_id_size(&mut self, id_size: IdSize) {
        self.id_size = Some(id_size);
    }

    /// Configured identifier size
    pub fn id_size(&self) -> Result<IdSize> {
        self.id_size.ok_or(Error::MissingIdSize)
    }

    /// Absolute source offset of the next byte to be read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes left in a bounded view, `None` for an unbounded cursor
    pub fn remaining(&self) -> Option<u64> {
        self.limit
    }

    /// Shared access to the sink
    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Releases the source and sink
    pub fn into_parts(self) -> (R, W) {
        (self.source, self.sink)
    }

    /// Reads one byte and forwards it
    pub fn read_forward_u1(&mut self) -> Result<u8> {
        let [b] = self.read_forward::<1>()?;
        Ok(b)
    }

    /// Reads a big-endian u2 and forwards it
    pub fn read_forward_u2(&mut self) -> Result<u16> {
        let buf = self.read_forward::<2>()?;
        Ok(BigEndian::read_u16(&buf))
    }

    /// Reads a big-endian u4 and forwards it
    pub fn read_forward_u4(&mut self) -> Result<u32> {
        let buf = self.read_forward::<4>()?;
        Ok(BigEndian::read_u32(&buf))
    }

    /// Reads an identifier of the configured width and forwards it.
    ///
    /// 8-byte identifiers must be non-negative when read as signed; anything
    /// else means the stream is corrupt or the width is wrong.
    pub fn read_forward_id(&mut self) -> Result<u64> {
        match self.id_size()? {
            IdSize::Four => Ok(u64::from(self.read_forward_u4()?)),
            IdSize::Eight => {
                let offset = self.offset;
                let buf = self.read_forward::<8>()?;
                let value = BigEndian::read_i64(&buf);
                u64::try_from(value).map_err(|_| Error::InvalidIdentifier { offset, value })
            }
        }
    }

    /// Reads and forwards bytes up to and including a zero byte.
    ///
    /// Returns the text before the terminator, decoded lossily as UTF-8.
    pub fn read_forward_null_terminated_string(&mut self) -> Result<String> {
        let mut text = Vec::new();
        loop {
            match self.read_forward_u1()? {
                0 => break,
                b => text.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&text).into_owned())
    }

    /// Reads the next tag byte, or `None` at a clean end of input.
    ///
    /// For unbounded cursors the end is source exhaustion. For bounded views
    /// the end is reaching the bound; running out of source before that is a
    /// truncation.
    pub fn read_tag_or_end(&mut self) -> Result<Option<u8>> {
        match self.limit {
            Some(0) => return Ok(None),
            Some(_) => return self.read_forward_u1().map(Some),
            None => {}
        }

        let mut buf = [0u8; 1];
        loop {
            match self.source.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += 1;
        self.sink.write_all(&buf)?;
        Ok(Some(buf[0]))
    }

    /// Copies exactly `len` bytes from source to sink unchanged
    pub fn pass_through(&mut self, len: u64) -> Result<()> {
        self.reserve(len)?;
        let copied = io::copy(&mut (&mut self.source).take(len), &mut self.sink)?;
        if copied < len {
            return Err(Error::truncated(self.offset, len, copied));
        }
        self.offset += len;
        Ok(())
    }

    /// Discards `len` source bytes and writes `len` bytes of `pattern`,
    /// repeated cyclically and cut to length.
    pub fn discard_and_mask(&mut self, len: u64, pattern: &MaskPattern) -> Result<()> {
        self.reserve(len)?;
        let skipped = io::copy(&mut (&mut self.source).take(len), &mut io::sink())?;
        if skipped < len {
            return Err(Error::truncated(self.offset, len, skipped));
        }
        self.offset += len;

        let block = pattern.block();
        let mut left = len;
        while left > 0 {
            let n = usize::try_from(left).map_or(block.len(), |l| l.min(block.len()));
            self.sink.write_all(&block[..n])?;
            left -= n as u64;
        }
        Ok(())
    }

    /// Opens a view restricted to the next `len` source bytes.
    ///
    /// The parent's offset moves past the whole range immediately.
    pub fn open_bounded(&mut self, len: u64) -> Result<Cursor<&mut R, &mut W>> {
        self.reserve(len)?;
        let start = self.offset;
        self.offset += len;
        Ok(Cursor {
            source: &mut self.source,
            sink: &mut self.sink,
            id_size: self.id_size,
            offset: start,
            limit: Some(len),
        })
    }

    fn read_forward<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        self.sink.write_all(&buf)?;
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reserve(buf.len() as u64)?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.source.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(Error::truncated(
                        self.offset,
                        buf.len() as u64,
                        filled as u64,
                    ))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// Charges `len` bytes against the view's bound
    fn reserve(&mut self, len: u64) -> Result<()> {
        if let Some(limit) = self.limit.as_mut() {
            if len > *limit {
                return Err(Error::truncated(self.offset, len, *limit));
            }
            *limit -= len;
        }
        Ok(())
    }
}

impl<R: Read, W: Write> Cursor<R, CountingSink<W>> {
    /// Total bytes written to the sink so far
    pub fn written(&self) -> u64 {
        self.sink.written()
    }
}
