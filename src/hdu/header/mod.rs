//! The ordered, append-only, sequence of keyword records of a HDU header.

use std::slice::Iter;

use crate::{
  common::{BITPIX, NAXIS, SIMPLE, kwrecord::HeaderRecord},
  error::Error,
  hdu::header::{
    bind::{BindKeywords, Bound},
    mandatory::PrimaryMandatoryKeywords,
  },
};

pub mod bind;
pub mod mandatory;

/// Keyword records in insertion order.
/// The sequence number of a record is its insertion index: unique and increasing.
/// Records are never reordered nor removed.
/// Duplicated keywords are allowed (e.g. `HISTORY`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
  records: Vec<HeaderRecord>,
}

impl Header {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build the header starting with `SIMPLE`, `BITPIX`, `NAXIS` and `NAXIS1` to `NAXISn`.
  /// No `END` record is added.
  pub fn create_minimal_primary_header(
    mandatory: &PrimaryMandatoryKeywords,
  ) -> Result<Self, Error> {
    let mut header = Self::new();
    header.append(HeaderRecord::logical(
      SIMPLE,
      mandatory.simple,
      Some("conforms to FITS standard"),
    )?);
    header.append(HeaderRecord::integer(
      BITPIX,
      mandatory.bitpix,
      Some("bits per data value"),
    )?);
    header.append(HeaderRecord::integer(
      NAXIS,
      mandatory.number_of_axes as i64,
      Some("number of axes"),
    )?);
    for (i, len) in mandatory.length_of_axis.iter().enumerate() {
      header.append(HeaderRecord::integer(
        &format!("{}{}", NAXIS, i + 1),
        *len as i64,
        Some(format!("length of data axis {}", i + 1).as_str()),
      )?);
    }
    Ok(header)
  }

  /// Append the given record, returning its sequence number.
  pub fn append(&mut self, record: HeaderRecord) -> usize {
    self.records.push(record);
    self.records.len() - 1
  }

  /// Append a `HISTORY` record, returning its sequence number.
  /// It may follow an `END` record: `FitsWriter::write_header_data_unit` holds `END` back.
  pub fn append_history(&mut self, text: &str) -> Result<usize, Error> {
    HeaderRecord::history(text).map(|r| self.append(r))
  }

  /// Append a `COMMENT` record, returning its sequence number.
  pub fn append_comment(&mut self, text: &str) -> Result<usize, Error> {
    HeaderRecord::comment(text).map(|r| self.append(r))
  }

  /// Value of the first record having exactly the given keyword.
  /// `None` if there is no such record, or if it has no value.
  pub fn lookup(&self, keyword: &str) -> Option<&str> {
    self
      .records
      .iter()
      .find(|r| r.keyword() == keyword)
      .and_then(HeaderRecord::value)
  }

  /// All records having exactly the given keyword, in header order.
  pub fn lookup_all<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a HeaderRecord> {
    self.records.iter().filter(move |r| r.keyword() == keyword)
  }

  /// The record of the given sequence number.
  pub fn get(&self, seq: usize) -> Option<&HeaderRecord> {
    self.records.get(seq)
  }

  pub fn iter(&self) -> Iter<'_, HeaderRecord> {
    self.records.iter()
  }

  pub fn records(&self) -> &[HeaderRecord] {
    &self.records
  }

  pub fn keywords(&self) -> impl DoubleEndedIterator<Item = &str> {
    self.records.iter().map(HeaderRecord::keyword)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// `true` if the last record is `END`.
  pub fn is_terminated(&self) -> bool {
    self.records.last().is_some_and(HeaderRecord::is_end)
  }

  /// Populate a `T` from this header.
  pub fn bind<T: BindKeywords>(&self) -> Bound<T> {
    bind::bind(self)
  }
}

impl<'a> IntoIterator for &'a Header {
  type Item = &'a HeaderRecord;
  type IntoIter = Iter<'a, HeaderRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.iter()
  }
}

impl FromIterator<HeaderRecord> for Header {
  fn from_iter<I: IntoIterator<Item = HeaderRecord>>(iter: I) -> Self {
    Self {
      records: iter.into_iter().collect(),
    }
  }
}

impl Extend<HeaderRecord> for Header {
  fn extend<I: IntoIterator<Item = HeaderRecord>>(&mut self, iter: I) {
    self.records.extend(iter)
  }
}
