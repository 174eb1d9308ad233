//! # heapmask-core
//!
//! A library for sanitizing Java HPROF heap dumps.
//!
//! This crate provides the core functionality for:
//! - Walking the full HPROF record grammar in a single forward pass
//! - Replacing the contents of `byte[]` and `char[]` arrays with a pattern
//! - Preserving every other byte and every declared length
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`stream`]: Read-and-forward cursor with bounded views and byte counting
//! - [`hprof`]: Record grammar, basic type sizes and the [`Sanitizer`]
//! - [`mask`]: Replacement patterns
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use heapmask_core::{MaskPattern, Sanitizer, SanitizerConfig};
//! use std::fs::File;
//! use std::io::{BufReader, BufWriter};
//!
//! let input = BufReader::new(File::open("heap.hprof")?);
//! let output = BufWriter::new(File::create("heap-sanitized.hprof")?);
//!
//! let config = SanitizerConfig::new().pattern(MaskPattern::from_text("*")?);
//! let summary = Sanitizer::with_config(config).sanitize(input, output)?;
//! println!("masked {} arrays", summary.arrays_masked);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod hprof;
pub mod mask;
pub mod stream;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use hprof::{BasicType, IdSize, SanitizeSummary, Sanitizer, SanitizerConfig};
pub use mask::MaskPattern;
pub use stream::{CountingSink, Cursor};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
