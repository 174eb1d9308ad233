//! Record tags and the heap dump sub-record grammar.
//!
//! Reference: the HPROF binary format as emitted by HotSpot's `heapDumper.cpp`.
//! Every heap dump sub-record starts with a one-byte tag followed by an
//! identifier; the tables below describe what follows that identifier.

use crate::error::{Error, Result};

/// Top-level record tag for a heap dump
pub const TAG_HEAP_DUMP: u8 = 0x0C;

/// Top-level record tag for a heap dump segment
pub const TAG_HEAP_DUMP_SEGMENT: u8 = 0x1C;

/// Whether a top-level tag carries heap dump sub-records
pub fn is_heap_dump(tag: u8) -> bool {
    tag == TAG_HEAP_DUMP || tag == TAG_HEAP_DUMP_SEGMENT
}

/// Human-readable name of a top-level record tag
pub fn record_name(tag: u8) -> &'static str {
    match tag {
        0x01 => "UTF8",
        0x02 => "LOAD CLASS",
        0x03 => "UNLOAD CLASS",
        0x04 => "STACK FRAME",
        0x05 => "STACK TRACE",
        0x06 => "ALLOC SITES",
        0x07 => "HEAP SUMMARY",
        0x0A => "START THREAD",
        0x0B => "END THREAD",
        TAG_HEAP_DUMP => "HEAP DUMP",
        0x0D => "CPU SAMPLES",
        0x0E => "CONTROL SETTINGS",
        TAG_HEAP_DUMP_SEGMENT => "HEAP DUMP SEGMENT",
        0x2C => "HEAP DUMP END",
        _ => "UNKNOWN",
    }
}

/// A fixed-width field in a sub-record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// An identifier of the stream's configured width
    Id,
    /// A big-endian u4
    U4,
}

/// Body shape of a heap dump sub-record, after its leading identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// A fixed sequence of fields with no sanitizable content
    Fixed(&'static [Field]),
    /// Class metadata with constant pool, static and instance field tables
    ClassDump,
    /// Raw instance field bytes, length-prefixed
    InstanceDump,
    /// Array of object identifiers
    ObjectArrayDump,
    /// Packed array of primitive values
    PrimitiveArrayDump,
}

/// Heap dump sub-record tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HeapTag {
    /// Root of unknown origin
    RootUnknown = 0xFF,
    /// JNI global reference
    RootJniGlobal = 0x01,
    /// JNI local reference
    RootJniLocal = 0x02,
    /// Java stack frame
    RootJavaFrame = 0x03,
    /// Native stack
    RootNativeStack = 0x04,
    /// System class
    RootStickyClass = 0x05,
    /// Reference from thread block
    RootThreadBlock = 0x06,
    /// Busy monitor
    RootMonitorUsed = 0x07,
    /// Thread object
    RootThreadObject = 0x08,
    /// Class dump
    ClassDump = 0x20,
    /// Instance dump
    InstanceDump = 0x21,
    /// Object array dump
    ObjectArrayDump = 0x22,
    /// Primitive array dump
    PrimitiveArrayDump = 0x23,
}

/// Sub-record grammar: tag, name, layout after the leading identifier
const GRAMMAR: &[(HeapTag, &str, Layout)] = &[
    (HeapTag::RootUnknown, "ROOT UNKNOWN", Layout::Fixed(&[])),
    (HeapTag::RootJniGlobal, "ROOT JNI GLOBAL", Layout::Fixed(&[Field::Id])),
    (HeapTag::RootJniLocal, "ROOT JNI LOCAL", Layout::Fixed(&[Field::U4, Field::U4])),
    (HeapTag::RootJavaFrame, "ROOT JAVA FRAME", Layout::Fixed(&[Field::U4, Field::U4])),
    (HeapTag::RootNativeStack, "ROOT NATIVE STACK", Layout::Fixed(&[Field::U4])),
    (HeapTag::RootStickyClass, "ROOT STICKY CLASS", Layout::Fixed(&[])),
    (HeapTag::RootThreadBlock, "ROOT THREAD BLOCK", Layout::Fixed(&[Field::U4])),
    (HeapTag::RootMonitorUsed, "ROOT MONITOR USED", Layout::Fixed(&[])),
    (HeapTag::RootThreadObject, "ROOT THREAD OBJECT", Layout::Fixed(&[Field::U4, Field::U4])),
    (HeapTag::ClassDump, "CLASS DUMP", Layout::ClassDump),
    (HeapTag::InstanceDump, "INSTANCE DUMP", Layout::InstanceDump),
    (HeapTag::ObjectArrayDump, "OBJECT ARRAY DUMP", Layout::ObjectArrayDump),
    (HeapTag::PrimitiveArrayDump, "PRIMITIVE ARRAY DUMP", Layout::PrimitiveArrayDump),
];

/// Fixed class dump header after the class id: stack trace serial, super
/// class, class loader, signers, protection domain, two reserved ids, and
/// instance size
pub const CLASS_DUMP_HEADER: &[Field] = &[
    Field::U4,
    Field::Id,
    Field::Id,
    Field::Id,
    Field::Id,
    Field::Id,
    Field::Id,
    Field::U4,
];

impl HeapTag {
    /// Looks up a sub-record tag; `offset` is used for error reporting only
    pub fn from_byte(tag: u8, offset: u64) -> Result<Self> {
        GRAMMAR
            .iter()
            .find(|(t, _, _)| *t as u8 == tag)
            .map(|(t, _, _)| *t)
            .ok_or_else(|| Error::unsupported_record(tag, offset))
    }

    fn entry(self) -> &'static (HeapTag, &'static str, Layout) {
        GRAMMAR
            .iter()
            .find(|(t, _, _)| *t == self)
            .unwrap_or_else(|| unreachable!("every HeapTag has a grammar entry"))
    }

    /// Body layout after the leading identifier
    pub fn layout(self) -> Layout {
        self.entry().2
    }

    /// Display name
    pub fn name(self) -> &'static str {
        self.entry().1
    }
}
