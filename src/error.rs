use std::io;

use thiserror::Error;

use crate::write::WriterState;

/// An error that can be produced during FITS parsing or read/writing.
pub type Error = Box<FitsError>;

fn bytes2str(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into()
}

pub(crate) fn new_io_err(err: io::Error) -> Error {
  FitsError::Io(err).into()
}

// Physical layout

pub(crate) fn new_incomplete_block_err(expected: usize, found: usize) -> Error {
  FitsError::IncompleteBlock { expected, found }.into()
}

pub(crate) fn new_record_len_err(expected: usize, found: usize) -> Error {
  FitsError::RecordLength { expected, found }.into()
}

pub(crate) fn new_non_ascii_record_err(record: &[u8]) -> Error {
  let record = bytes2str(record);
  FitsError::NonAsciiRecord { record }.into()
}

pub(crate) fn new_missing_end_err(n_records: usize) -> Error {
  FitsError::MissingEndRecord { n_records }.into()
}

// Record grammar

pub(crate) fn new_empty_kw_err() -> Error {
  FitsError::EmptyKeyword.into()
}

pub(crate) fn new_kw_too_long_err(keyword: &str) -> Error {
  FitsError::KeywordTooLong {
    keyword: keyword.into(),
  }
  .into()
}

pub(crate) fn new_invalid_kw_char_err(keyword: &str) -> Error {
  FitsError::InvalidKeywordCharacter {
    keyword: keyword.into(),
  }
  .into()
}

pub(crate) fn new_value_expected_err(keyword: &str, record: &[u8]) -> Error {
  FitsError::ValueExpected {
    keyword: keyword.into(),
    record: bytes2str(record),
  }
  .into()
}

pub(crate) fn new_commentary_with_value_err(keyword: &str) -> Error {
  FitsError::CommentaryWithValue {
    keyword: keyword.into(),
  }
  .into()
}

pub(crate) fn new_record_overflow_err(keyword: &str, len: usize) -> Error {
  FitsError::RecordOverflow {
    keyword: keyword.into(),
    len,
  }
  .into()
}

pub(crate) fn new_invalid_header_record_err(record: &[u8], source: Error) -> Error {
  FitsError::InvalidHeaderRecord {
    record: bytes2str(record),
    source,
  }
  .into()
}

// Values

pub(crate) fn new_unexpected_value<T: ToString, S: ToString>(expected: T, found: S) -> Error {
  let expected = expected.to_string();
  let found = found.to_string();
  FitsError::UnexpectedValue { expected, found }.into()
}

pub(crate) fn new_unsupported_bitpix_err(found: i64) -> Error {
  FitsError::UnsupportedBitPix { found }.into()
}

// Data

pub(crate) fn new_axis_count_mismatch_err(declared: u16, found: usize) -> Error {
  FitsError::AxisCountMismatch { declared, found }.into()
}

pub(crate) fn new_truncated_data_err(expected: usize, found: usize) -> Error {
  FitsError::TruncatedDataArray { expected, found }.into()
}

fn dims2str(dims: &[u64]) -> String {
  dims
    .iter()
    .map(|d| d.to_string())
    .reduce(|mut s, d| {
      s.push('x');
      s.push_str(&d);
      s
    })
    .unwrap_or_else(|| String::from("0"))
}

pub(crate) fn new_unsupported_dims_err(dims: &[u64]) -> Error {
  let dims = dims2str(dims);
  FitsError::UnsupportedDimensions { dims }.into()
}

pub(crate) fn new_data_array_overflow_err(bitpix: i64, dims: &[u64]) -> Error {
  let dims = dims2str(dims);
  FitsError::DataArrayOverflow { bitpix, dims }.into()
}

// Writer

pub(crate) fn new_phase_violation_err(
  operation: &'static str,
  state: WriterState,
  detail: &'static str,
) -> Error {
  FitsError::PhaseViolation {
    operation,
    state,
    detail,
  }
  .into()
}

pub(crate) fn new_custom<I: Into<String>>(msg: I) -> Error {
  FitsError::Custom { msg: msg.into() }.into()
}

#[derive(Error, Debug)]
pub enum FitsError {
  // IO related
  #[error("I/O error: {0}.")]
  Io(#[from] io::Error),
  #[error("Incomplete FITS block. Expected: {expected} bytes. Actual: {found} bytes.")]
  IncompleteBlock { expected: usize, found: usize },
  #[error("Wrong record length. Expected: {expected} bytes. Actual: {found} bytes.")]
  RecordLength { expected: usize, found: usize },
  #[error("Non ASCII character in keyword record \"{record}\".")]
  NonAsciiRecord { record: String },
  #[error("End of stream reached after {n_records} keyword records without any 'END' record.")]
  MissingEndRecord { n_records: usize },

  // Keyword record grammar
  #[error("Empty keyword.")]
  EmptyKeyword,
  #[error("Keyword '{keyword}' is longer than 8 characters.")]
  KeywordTooLong { keyword: String },
  #[error("Keyword '{keyword}' contains characters out of [0-9A-Z_-].")]
  InvalidKeywordCharacter { keyword: String },
  #[error("Value expected after the value indicator of keyword '{keyword}' in \"{record}\".")]
  ValueExpected { keyword: String, record: String },
  #[error("Commentary keyword '{keyword}' can not carry a value.")]
  CommentaryWithValue { keyword: String },
  #[error("Keyword record '{keyword}' needs {len} characters, more than 80.")]
  RecordOverflow { keyword: String, len: usize },
  #[error("Invalid header record \"{record}\". Error: {source}")]
  InvalidHeaderRecord { record: String, source: Error },

  // Values
  #[error("Wrong value. Expected: '{expected}'. Actual: '{found}'.")]
  UnexpectedValue { expected: String, found: String },
  #[error("Unsupported BITPIX value. Expected: one of [8, 16, 32, 64, -32, -64]. Actual: {found}.")]
  UnsupportedBitPix { found: i64 },

  // Data
  #[error("NAXIS = {declared} but {found} NAXISn keyword(s) found.")]
  AxisCountMismatch { declared: u16, found: usize },
  #[error("Truncated data array. Expected: {expected} bytes. Actual: {found} bytes.")]
  TruncatedDataArray { expected: usize, found: usize },
  #[error("Unsupported image dimensions {dims}: a single 2D plane is expected.")]
  UnsupportedDimensions { dims: String },
  #[error("Data array size overflow. BITPIX: {bitpix}. Dimensions: {dims}.")]
  DataArrayOverflow { bitpix: i64, dims: String },

  // Writer
  #[error("Operation '{operation}' not allowed in writer state {state:?}: {detail}.")]
  PhaseViolation {
    operation: &'static str,
    state: WriterState,
    detail: &'static str,
  },

  // Context
  #[error("Error: {source}\nKeyword record context: {keyword_record}.")]
  WithKwRecordContext {
    keyword_record: String,
    source: Error,
  },

  #[error("Custom error: '{msg}'.")]
  Custom { msg: String },
}

impl FitsError {
  /// Add to the error the full keyword record on which the error occurs.
  pub(crate) fn kwr_context(self, kw_record: &[u8; 80]) -> Error {
    Self::WithKwRecordContext {
      keyword_record: bytes2str(kw_record),
      source: self.into(),
    }
    .into()
  }

  /// Returns `true` for all violations of the record, keyword, value or block layout rules.
  /// An incomplete block is a format error.
  pub fn is_format_error(&self) -> bool {
    match self {
      Self::Io(_) | Self::PhaseViolation { .. } | Self::Custom { .. } => false,
      Self::WithKwRecordContext { source, .. } => source.is_format_error(),
      _ => true,
    }
  }

  /// Returns `true` only for the errors a header scan may skip, i.e. a single malformed record.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::InvalidHeaderRecord { .. })
  }

  /// Returns `true` for misuses of the writer API.
  pub fn is_phase_violation(&self) -> bool {
    matches!(self, Self::PhaseViolation { .. })
  }
}
