//! Sequential reading of HDUs from a stream.

use std::io::Read;

use log::{debug, warn};

use crate::{
  common::{kwrecord::HeaderRecord, record::Record},
  error::{
    Error, FitsError, new_axis_count_mismatch_err, new_custom, new_invalid_header_record_err,
    new_missing_end_err,
  },
  hdu::{
    DataType, HeaderDataUnit,
    header::{
      Header,
      mandatory::{DataArrayGeometry, MandatoryKeywords},
    },
  },
  read::block::BlockReader,
};

/// Reads the HDUs of a FITS stream, one after the other.
/// The source is borrowed, never closed.
pub struct FitsReader<'a, R: Read> {
  blocks: BlockReader<'a, R>,
}

impl<'a, R: Read> FitsReader<'a, R> {
  pub fn new(source: &'a mut R) -> Self {
    Self {
      blocks: BlockReader::new(source),
    }
  }

  /// Read keyword records up to, and including, the `END` record.
  /// A malformed record is logged and skipped.
  ///
  /// # Errors
  /// * `MissingEndRecord` if the stream ends (at a block boundary) before `END`;
  /// * `IncompleteBlock` if the stream ends in the middle of a block;
  /// * I/O errors.
  pub fn read_primary_header(&mut self) -> Result<Header, Error> {
    self
      .scan_header()?
      .ok_or_else(|| new_missing_end_err(0))
  }

  /// Read the primary header, then its data array.
  ///
  /// # Errors
  /// In addition to the header errors:
  /// * the number of `NAXISn` differs from `NAXIS`;
  /// * unsupported `BITPIX` for a non-empty data array;
  /// * incomplete data blocks.
  pub fn read_primary_header_data_unit(&mut self) -> Result<HeaderDataUnit, Error> {
    let header = self.read_primary_header()?;
    self.read_data_unit(header)
  }

  /// Read the next HDU, `None` if the stream ends cleanly before it.
  /// Allows to read the HDUs concatenated after the primary one.
  pub fn read_next_header_data_unit(&mut self) -> Result<Option<HeaderDataUnit>, Error> {
    match self.scan_header()? {
      Some(header) => self.read_data_unit(header).map(Some),
      None => Ok(None),
    }
  }

  /// Number of bytes consumed from the source.
  pub fn position(&self) -> u64 {
    self.blocks.position()
  }

  /// `None` if the stream ends before the first record.
  fn scan_header(&mut self) -> Result<Option<Header>, Error> {
    let mut header = Header::new();
    let mut n_records = 0_usize;
    loop {
      let record = match self.blocks.read_record() {
        Ok(record) => record,
        Err(e) if matches!(*e, FitsError::IncompleteBlock { found: 0, .. }) => {
          return if n_records == 0 {
            Ok(None)
          } else {
            Err(new_missing_end_err(n_records))
          };
        }
        Err(e) => return Err(e),
      };
      n_records += 1;
      match scan_record(&record) {
        Ok(record) => {
          let is_end = record.is_end();
          header.append(record);
          if is_end {
            debug!("Header of {} records read ({} kept).", n_records, header.len());
            return Ok(Some(header));
          }
        }
        Err(e) => warn!("Keyword record skipped. {}", e),
      }
    }
  }

  fn read_data_unit(&mut self, header: Header) -> Result<HeaderDataUnit, Error> {
    let mandatory = header.bind::<MandatoryKeywords>().into_value();
    self.blocks.move_to_block_boundary();
    if mandatory.number_of_axes as usize != mandatory.length_of_axis.len() {
      return Err(new_axis_count_mismatch_err(
        mandatory.number_of_axes,
        mandatory.length_of_axis.len(),
      ));
    }
    if mandatory.number_of_axes == 0 {
      return HeaderDataUnit::new(header, mandatory, DataType::None, Vec::new());
    }
    mandatory.bitpix_checked()?;
    let n_bytes = mandatory.data_array_length_bytes()?;
    let len = usize::try_from(n_bytes).map_err(|_| {
      new_custom(format!(
        "Data array of {} bytes too large for this platform.",
        n_bytes
      ))
    })?;
    let raw_data = self.blocks.read_bytes(len)?;
    self.blocks.move_to_block_boundary();
    debug!("Data array of {} bytes read.", len);
    HeaderDataUnit::new(header, mandatory, DataType::Image, raw_data)
  }
}

/// Parse a record read during a header scan, the failure being recoverable.
fn scan_record(record: &Record) -> Result<HeaderRecord, Error> {
  HeaderRecord::parse(record).map_err(|e| new_invalid_header_record_err(record.as_bytes(), e))
}
