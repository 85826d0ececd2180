//! The 80 bytes record, atomic text unit of a FITS header.

use std::{borrow::Cow, fmt};

use crate::{
  common::{HEADER_PAD, RECORD_LEN},
  error::{Error, new_record_len_err},
};

/// An exactly 80 bytes unit.
/// Constructed from a wrong-length buffer, it fails.
#[derive(Clone, PartialEq, Eq)]
pub struct Record([u8; RECORD_LEN]);

impl Record {
  /// A record made of 80 spaces.
  pub const fn blank() -> Self {
    Self([HEADER_PAD; RECORD_LEN])
  }

  pub const fn from_array(bytes: [u8; RECORD_LEN]) -> Self {
    Self(bytes)
  }

  /// Copy the given bytes, failing if there are not exactly 80 of them.
  pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
    <[u8; RECORD_LEN]>::try_from(bytes)
      .map(Self)
      .map_err(|_| new_record_len_err(RECORD_LEN, bytes.len()))
  }

  /// Build a record from a text of at most 80 characters, right padded with spaces.
  pub fn from_text(text: &str) -> Result<Self, Error> {
    let bytes = text.as_bytes();
    if bytes.len() > RECORD_LEN {
      Err(new_record_len_err(RECORD_LEN, bytes.len()))
    } else {
      let mut record = [HEADER_PAD; RECORD_LEN];
      record[..bytes.len()].copy_from_slice(bytes);
      Ok(Self(record))
    }
  }

  pub fn encode(&self) -> &[u8; RECORD_LEN] {
    &self.0
  }

  pub fn as_bytes(&self) -> &[u8] {
    self.0.as_slice()
  }

  /// The record text, non ASCII bytes being replaced.
  pub fn text(&self) -> Cow<'_, str> {
    String::from_utf8_lossy(self.0.as_slice())
  }
}

impl Default for Record {
  fn default() -> Self {
    Self::blank()
  }
}

impl fmt::Display for Record {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text())
  }
}

impl fmt::Debug for Record {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Record(\"{}\")", self.text())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode() {
    let bytes = [b'A'; 80];
    let record = Record::decode(&bytes).unwrap();
    assert_eq!(record.encode(), &bytes);

    let err = Record::decode(&bytes[..79]).unwrap_err();
    assert!(matches!(
      *err,
      crate::error::FitsError::RecordLength {
        expected: 80,
        found: 79
      }
    ));
    assert!(Record::decode(&[b' '; 81]).is_err());
  }

  #[test]
  fn test_from_text() {
    let record = Record::from_text("END").unwrap();
    assert_eq!(record.text().len(), 80);
    assert!(record.text().starts_with("END "));
    assert_eq!(record.text().trim_end(), "END");
    assert!(Record::from_text(&"X".repeat(81)).is_err());
  }
}
