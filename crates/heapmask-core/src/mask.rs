//! Sanitization patterns.
//!
//! A [`MaskPattern`] is the byte sequence written in place of masked array
//! contents. It is repeated cyclically and cut to the exact length of the
//! array it replaces, so enclosing length fields never change.

use crate::error::{Error, Result};
use bytes::Bytes;

/// Size of the pre-expanded block used when writing long masked runs
const BLOCK_TARGET: usize = 8 * 1024;

/// A non-empty replacement pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPattern {
    bytes: Bytes,
    block: Bytes,
}

impl Default for MaskPattern {
    fn default() -> Self {
        Self::expand(Bytes::from_static(&[0]))
    }
}

impl MaskPattern {
    /// Creates a pattern from raw bytes, rejecting an empty sequence
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::EmptyPattern);
        }
        Ok(Self::expand(bytes))
    }

    fn expand(bytes: Bytes) -> Self {
        let repeats = BLOCK_TARGET.div_ceil(bytes.len()).max(1);
        let block = Bytes::from(bytes.repeat(repeats));
        Self { bytes, block }
    }

    /// Creates a pattern from the UTF-8 encoding of `text`
    pub fn from_text(text: &str) -> Result<Self> {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Creates a pattern from text containing backslash escapes.
    ///
    /// Supports `\0`..`\377` (octal), `\b`, `\t`, `\n`, `\f`, `\r`, `\"`,
    /// `\'`, `\\` and `\uXXXX`. The unescaped text is UTF-8 encoded.
    pub fn from_escaped(text: &str) -> Result<Self> {
        Self::from_text(&unescape(text)?)
    }

    /// Returns the pattern bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the pattern length in bytes (never zero)
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the pattern has no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pattern repeated a whole number of times, close to [`BLOCK_TARGET`] bytes.
    ///
    /// Every block starts at phase zero of the pattern, so writing full blocks
    /// followed by a prefix of one block reproduces the infinite repetition.
    pub(crate) fn block(&self) -> &[u8] {
        &self.block
    }

    /// First `len` bytes of the infinite repetition of this pattern
    pub fn cycled(&self, len: usize) -> Vec<u8> {
        self.bytes.iter().copied().cycle().take(len).collect()
    }
}

fn unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        let Some(&next) = chars.get(i + 1) else {
            return Err(Error::invalid_escape(start, "trailing backslash"));
        };
        i += 2;

        match next {
            'b' => out.push('\u{8}'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'f' => out.push('\u{c}'),
            'r' => out.push('\r'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            '\\' => out.push('\\'),
            'u' => {
                let digits: String = chars.iter().skip(i).take(4).collect();
                if digits.len() != 4 {
                    return Err(Error::invalid_escape(start, "incomplete unicode escape"));
                }
                let value = u32::from_str_radix(&digits, 16).map_err(|_| {
                    Error::invalid_escape(start, format!("invalid unicode escape: \\u{}", digits))
                })?;
                let ch = char::from_u32(value).ok_or_else(|| {
                    Error::invalid_escape(start, format!("not a scalar value: \\u{}", digits))
                })?;
                out.push(ch);
                i += 4;
            }
            '0'..='7' => {
                // Up to three octal digits, value capped at \377
                let max_digits = if next <= '3' { 3 } else { 2 };
                let mut value = next as u32 - '0' as u32;
                let mut taken = 1;
                while taken < max_digits {
                    match chars.get(i) {
                        Some(&d @ '0'..='7') => {
                            value = value * 8 + (d as u32 - '0' as u32);
                            i += 1;
                            taken += 1;
                        }
                        _ => break,
                    }
                }
                // value <= 0o377, always a valid scalar
                out.push(char::from_u32(value).unwrap_or('\0'));
            }
            other => {
                return Err(Error::invalid_escape(
                    start,
                    format!("unknown escape: \\{}", other),
                ));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(MaskPattern::new(Vec::new()), Err(Error::EmptyPattern)));
        assert!(matches!(MaskPattern::from_text(""), Err(Error::EmptyPattern)));
    }

    #[test]
    fn test_default_is_nul() {
        assert_eq!(MaskPattern::default().as_bytes(), &[0]);
    }

    #[test]
    fn test_from_escaped() {
        assert_eq!(MaskPattern::from_escaped("\\0").unwrap().as_bytes(), &[0]);
        assert_eq!(MaskPattern::from_escaped("\0").unwrap().as_bytes(), &[0]);
        assert_eq!(
            MaskPattern::from_escaped("foobar").unwrap().as_bytes(),
            b"foobar"
        );
        assert_eq!(
            MaskPattern::from_escaped("a\\tb\\n").unwrap().as_bytes(),
            b"a\tb\n"
        );
        assert_eq!(MaskPattern::from_escaped("\\101").unwrap().as_bytes(), b"A");
        assert_eq!(
            MaskPattern::from_escaped("\\u00e9").unwrap().as_bytes(),
            "é".as_bytes()
        );
        assert_eq!(MaskPattern::from_escaped("\\\\").unwrap().as_bytes(), b"\\");
    }

    #[test]
    fn test_invalid_escapes() {
        assert!(matches!(
            MaskPattern::from_escaped("abc\\"),
            Err(Error::InvalidEscape { position: 3, .. })
        ));
        assert!(MaskPattern::from_escaped("\\q").is_err());
        assert!(MaskPattern::from_escaped("\\u12").is_err());
        assert!(MaskPattern::from_escaped("\\uZZZZ").is_err());
    }

    #[test]
    fn test_cycled() {
        let pattern = MaskPattern::from_text("ABCDE").unwrap();
        assert_eq!(pattern.cycled(3), b"ABC");
        assert_eq!(pattern.cycled(7), b"ABCDEAB");
        assert!(pattern.cycled(0).is_empty());
    }

    #[test]
    fn test_block_is_whole_repetitions() {
        let pattern = MaskPattern::from_text("abc").unwrap();
        let block = pattern.block();
        assert_eq!(block.len() % 3, 0);
        assert!(block.len() >= BLOCK_TARGET);
        assert_eq!(&block[..6], b"abcabc");
    }

    #[test]
    fn test_block_is_shared_between_clones() {
        let pattern = MaskPattern::from_text("xy").unwrap();
        let copy = pattern.clone();
        assert_eq!(pattern.block().as_ptr(), pattern.block().as_ptr());
        assert_eq!(pattern.block().as_ptr(), copy.block().as_ptr());
    }
}
