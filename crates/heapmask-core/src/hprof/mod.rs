//! HPROF heap dump sanitization.
//!
//! This module walks an HPROF stream front to back, forwarding every byte
//! except the contents of `byte[]` and `char[]` primitive arrays, which are
//! replaced by the configured [`MaskPattern`].
//!
//! ## Stream Layout
//!
//! ```text
//! header:  [u1]* format name, NUL terminated
//!          u4    identifier size (4 or 8)
//!          u8    timestamp (ms since epoch)
//! record:  u1    tag
//!          u4    time offset (µs since header timestamp)
//!          u4    body length
//!          [u1]* body
//! ```
//!
//! Records tagged HEAP DUMP or HEAP DUMP SEGMENT carry a sequence of
//! sub-records in their body (see [`layout`]); all other bodies are opaque.
//!
//! Masking never changes a length: every masked array is replaced by exactly
//! as many bytes as it held, so the output stays a valid dump.

pub mod layout;
mod types;

#[cfg(test)]
mod fixture;

use crate::error::{Error, Result};
use crate::mask::MaskPattern;
use crate::stream::{CountingSink, Cursor};
use layout::{Field, HeapTag, Layout, CLASS_DUMP_HEADER};
use std::io::{Read, Write};
use tracing::{debug, trace};

pub use types::{value_size, BasicType, IdSize};

/// Configuration for the sanitizer
#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    /// Replacement bytes for masked arrays
    pub pattern: MaskPattern,
    /// When false, primitive arrays pass through verbatim
    pub masking: bool,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            pattern: MaskPattern::default(),
            masking: true,
        }
    }
}

impl SanitizerConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replacement pattern
    pub fn pattern(mut self, pattern: MaskPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Enables or disables masking
    pub fn masking(mut self, enabled: bool) -> Self {
        self.masking = enabled;
        self
    }
}

/// What a completed run saw and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeSummary {
    /// Format name from the header
    pub format: String,
    /// Identifier size from the header
    pub id_size: IdSize,
    /// Total bytes written to the sink
    pub bytes_written: u64,
    /// Number of top-level records
    pub records: u64,
    /// Number of heap dump sub-records
    pub heap_records: u64,
    /// Number of primitive arrays whose contents were replaced
    pub arrays_masked: u64,
    /// Number of array bytes replaced
    pub bytes_masked: u64,
}

/// Streaming HPROF sanitizer
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Sanitizer {
    /// Creates a new sanitizer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new sanitizer with custom configuration
    pub fn with_config(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    /// Sanitizes `source` into `sink`.
    ///
    /// On error, whatever was already written to `sink` is a truncated
    /// artifact and should be discarded.
    pub fn sanitize<R: Read, W: Write>(&self, source: R, sink: W) -> Result<SanitizeSummary> {
        self.run(Cursor::new(source, CountingSink::new(sink)))
    }

    /// Sanitizes `source` into `sink`, reporting cumulative bytes written
    pub fn sanitize_with_progress<R, W, F>(
        &self,
        source: R,
        sink: W,
        progress: F,
    ) -> Result<SanitizeSummary>
    where
        R: Read,
        W: Write,
        F: FnMut(u64) + 'static,
    {
        self.run(Cursor::new(source, CountingSink::with_progress(sink, progress)))
    }

    fn run<R: Read, W: Write>(
        &self,
        mut cursor: Cursor<R, CountingSink<W>>,
    ) -> Result<SanitizeSummary> {
        let format = cursor.read_forward_null_terminated_string()?;
        debug!("Heap dump format: {}", format.trim());

        let id_size = IdSize::try_from(cursor.read_forward_u4()?)?;
        cursor.set_id_size(id_size);
        debug!("Identifier size: {}", id_size.bytes());

        cursor.pass_through(8)?;

        let mut walk = Walk {
            config: &self.config,
            records: 0,
            heap_records: 0,
            arrays_masked: 0,
            bytes_masked: 0,
        };

        while let Some(tag) = cursor.read_tag_or_end()? {
            walk.record(&mut cursor, tag)?;
        }

        let bytes_written = cursor.written();
        let (_, mut sink) = cursor.into_parts();
        sink.flush()?;

        let summary = SanitizeSummary {
            format,
            id_size,
            bytes_written,
            records: walk.records,
            heap_records: walk.heap_records,
            arrays_masked: walk.arrays_masked,
            bytes_masked: walk.bytes_masked,
        };
        debug!(
            "Sanitized {} records ({} heap sub-records), masked {} arrays ({} bytes)",
            summary.records, summary.heap_records, summary.arrays_masked, summary.bytes_masked
        );
        Ok(summary)
    }
}

/// Per-run walking state
struct Walk<'a> {
    config: &'a SanitizerConfig,
    records: u64,
    heap_records: u64,
    arrays_masked: u64,
    bytes_masked: u64,
}

impl Walk<'_> {
    /// Handles one top-level record whose tag has already been forwarded
    fn record<R: Read, W: Write>(&mut self, cursor: &mut Cursor<R, W>, tag: u8) -> Result<()> {
        cursor.read_forward_u4()?; // time offset
        let length = u64::from(cursor.read_forward_u4()?);
        trace!(
            "Record 0x{:02X} ({}) at offset {}: {} bytes",
            tag,
            layout::record_name(tag),
            cursor.offset(),
            length
        );
        self.records += 1;

        if layout::is_heap_dump(tag) {
            let mut view = cursor.open_bounded(length)?;
            self.heap_dump(&mut view)
        } else {
            cursor.pass_through(length)
        }
    }

    /// Walks sub-records until the bounded view is exhausted
    fn heap_dump<R: Read, W: Write>(&mut self, view: &mut Cursor<R, W>) -> Result<()> {
        loop {
            let offset = view.offset();
            let Some(byte) = view.read_tag_or_end()? else {
                return Ok(());
            };
            let tag = HeapTag::from_byte(byte, offset)?;
            trace!("Heap sub-record {} at offset {}", tag.name(), offset);
            self.heap_records += 1;

            view.read_forward_id()?;

            match tag.layout() {
                Layout::Fixed(fields) => forward_fields(view, fields)?,
                Layout::ClassDump => class_dump(view)?,
                Layout::InstanceDump => instance_dump(view)?,
                Layout::ObjectArrayDump => object_array_dump(view)?,
                Layout::PrimitiveArrayDump => self.primitive_array_dump(view)?,
            }
        }
    }

    fn primitive_array_dump<R: Read, W: Write>(&mut self, view: &mut Cursor<R, W>) -> Result<()> {
        view.read_forward_u4()?; // stack trace serial
        let count = u64::from(view.read_forward_u4()?);
        let element_type = BasicType::try_from(view.read_forward_u1()?)?;
        let element_size = element_type.value_size(view.id_size()?) as u64;
        let length = count.checked_mul(element_size).ok_or(Error::Overflow {
            count,
            element_size,
        })?;

        if self.config.masking && element_type.is_maskable() {
            view.discard_and_mask(length, &self.config.pattern)?;
            self.arrays_masked += 1;
            self.bytes_masked += length;
        } else {
            view.pass_through(length)?;
        }
        Ok(())
    }
}

fn forward_fields<R: Read, W: Write>(view: &mut Cursor<R, W>, fields: &[Field]) -> Result<()> {
    for field in fields {
        match field {
            Field::Id => view.read_forward_id().map(drop)?,
            Field::U4 => view.read_forward_u4().map(drop)?,
        }
    }
    Ok(())
}

/// Forwards a typed value whose width follows from its basic type code
fn forward_value<R: Read, W: Write>(view: &mut Cursor<R, W>, code: u8) -> Result<()> {
    let size = value_size(code, view.id_size()?)?;
    view.pass_through(size as u64)
}

fn class_dump<R: Read, W: Write>(view: &mut Cursor<R, W>) -> Result<()> {
    forward_fields(view, CLASS_DUMP_HEADER)?;

    let constants = view.read_forward_u2()?;
    for _ in 0..constants {
        view.read_forward_u2()?; // constant pool index
        let code = view.read_forward_u1()?;
        forward_value(view, code)?;
    }

    let statics = view.read_forward_u2()?;
    for _ in 0..statics {
        view.read_forward_id()?; // name string id
        let code = view.read_forward_u1()?;
        forward_value(view, code)?;
    }

    let fields = view.read_forward_u2()?;
    for _ in 0..fields {
        view.read_forward_id()?; // name string id
        view.read_forward_u1()?; // type
    }
    Ok(())
}

fn instance_dump<R: Read, W: Write>(view: &mut Cursor<R, W>) -> Result<()> {
    view.read_forward_u4()?; // stack trace serial
    view.read_forward_id()?; // class id
    let length = u64::from(view.read_forward_u4()?);
    view.pass_through(length)
}

fn object_array_dump<R: Read, W: Write>(view: &mut Cursor<R, W>) -> Result<()> {
    view.read_forward_u4()?; // stack trace serial
    let count = view.read_forward_u4()?;
    view.read_forward_id()?; // array class id
    for _ in 0..count {
        view.read_forward_id()?;
    }
    Ok(())
}
