//! FITS layout rules shared by the reader, the writer and the keyword record codec.

use std::ops::Range;

pub mod keywords;
pub mod kwrecord;
pub mod record;

/// Size, in bytes (ASCII characters), of a keyword record.
pub const RECORD_LEN: usize = 80;
/// Number of keyword records in a block.
pub const RECORDS_PER_BLOCK: usize = 36;
/// Size, in bytes, of a FITS block, the atomic physical I/O unit.
pub const BLOCK_LEN: usize = RECORDS_PER_BLOCK * RECORD_LEN;

/// Maximum length of a keyword.
pub const KW_LEN: usize = 8;
/// Keyword byte range in a raw keyword record (columns 1 to 8).
pub(crate) const KW_RANGE: Range<usize> = 0..KW_LEN;
/// Value Indicator byte range in a raw keyword record (columns 9 and 10).
pub(crate) const VI_RANGE: Range<usize> = 8..10;
/// Value plus comment byte range in a raw keyword record (columns 11 to 80).
pub(crate) const VC_RANGE: Range<usize> = 10..RECORD_LEN;

/// Value of the value indicator, if present.
pub const VALUE_INDICATOR: &[u8; 2] = b"= ";
/// Marker starting a comment.
pub const COMMENT_MARKER: char = '/';
/// Delimiter of string values.
pub const QUOTE: char = '\'';

/// Padding byte of header blocks.
pub const HEADER_PAD: u8 = b' ';
/// Padding byte of data blocks.
pub const DATA_PAD: u8 = 0;

pub const END: &str = "END";
pub const SIMPLE: &str = "SIMPLE";
pub const BITPIX: &str = "BITPIX";
pub const NAXIS: &str = "NAXIS";
pub const COMMENT: &str = "COMMENT";
pub const HISTORY: &str = "HISTORY";

/// Keywords never carrying a value, their records contain free text from column 9.
pub const COMMENTARY_KEYWORDS: [&str; 2] = [COMMENT, HISTORY];

/// Tells whether the given (trimmed) keyword is `COMMENT` or `HISTORY`.
pub fn is_commentary(keyword: &str) -> bool {
  COMMENTARY_KEYWORDS.contains(&keyword)
}

/// Tells whether the given byte is allowed in a keyword, i.e. is in `[0-9A-Z_-]`.
pub const fn is_keyword_byte(b: u8) -> bool {
  matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_')
}

/// Tells whether all characters of the given (trimmed) keyword are in `[0-9A-Z_-]`.
/// The empty keyword is valid.
pub fn is_valid_keyword(keyword: &str) -> bool {
  keyword.bytes().all(is_keyword_byte)
}

/// Number of bytes to add to `len` to reach the next block boundary.
pub const fn block_padding(len: usize) -> usize {
  match len % BLOCK_LEN {
    0 => 0,
    rem => BLOCK_LEN - rem,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_layout() {
    assert_eq!(BLOCK_LEN, 2880);
    assert_eq!(KW_RANGE.len() + VI_RANGE.len() + VC_RANGE.len(), RECORD_LEN);
  }

  #[test]
  fn test_keyword_charset() {
    assert!(is_valid_keyword("NAXIS1"));
    assert!(is_valid_keyword("DATE-OBS"));
    assert!(is_valid_keyword("_A-1"));
    assert!(is_valid_keyword(""));
    assert!(!is_valid_keyword("naxis"));
    assert!(!is_valid_keyword("KEY WORD"));
    assert!(!is_valid_keyword("KEY.WORD"));
  }

  #[test]
  fn test_block_padding() {
    assert_eq!(block_padding(0), 0);
    assert_eq!(block_padding(1), 2879);
    assert_eq!(block_padding(2880), 0);
    assert_eq!(block_padding(256), 2624);
  }
}
