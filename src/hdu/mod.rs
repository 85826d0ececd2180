//! Header Data Unit: a header plus the (possibly empty) data array it describes.

use ndarray::Array2;

use crate::{
  common::keywords::bitpix::BitPix,
  error::{Error, new_custom, new_data_array_overflow_err, new_truncated_data_err},
  hdu::header::{
    Header,
    mandatory::{DataArrayGeometry, ImageScaling, MandatoryKeywords, PrimaryMandatoryKeywords},
  },
};

pub mod header;
pub mod image;

/// Kind of data following a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
  /// No data array (`NAXIS = 0`).
  None,
  Image,
  Table,
  BinaryTable,
  Other,
}

/// An assembled HDU. Only append style helpers modify it once built.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderDataUnit {
  header: Header,
  mandatory: MandatoryKeywords,
  data_type: DataType,
  raw_data: Vec<u8>,
  data_array_length_bits: u64,
}

impl HeaderDataUnit {
  /// # Errors
  /// If the data array size declared by the mandatory keywords overflows.
  pub fn new(
    header: Header,
    mandatory: MandatoryKeywords,
    data_type: DataType,
    raw_data: Vec<u8>,
  ) -> Result<Self, Error> {
    let data_array_length_bits = mandatory.data_array_length_bits()?;
    Ok(Self {
      header,
      mandatory,
      data_type,
      raw_data,
      data_array_length_bits,
    })
  }

  /// Build a primary image HDU from its (big-endian) data array, with a minimal header.
  ///
  /// # Errors
  /// If the data length does not match `|BITPIX| x NAXIS1 x ... x NAXISn / 8`,
  /// or if that size overflows.
  pub fn new_image(
    bitpix: BitPix,
    length_of_axis: Vec<u64>,
    raw_data: Vec<u8>,
  ) -> Result<Self, Error> {
    let primary = PrimaryMandatoryKeywords::new(bitpix, length_of_axis);
    let expected = usize::try_from(primary.data_array_length_bytes()?)
      .map_err(|_| new_data_array_overflow_err(primary.bitpix, &primary.length_of_axis))?;
    if raw_data.len() < expected {
      return Err(new_truncated_data_err(expected, raw_data.len()));
    } else if raw_data.len() > expected {
      return Err(new_custom(format!(
        "Data array of {} bytes larger than the {} bytes declared by the header.",
        raw_data.len(),
        expected
      )));
    }
    let header = primary.to_header()?;
    let data_type = if primary.number_of_axes == 0 {
      DataType::None
    } else {
      DataType::Image
    };
    Self::new(header, primary.into(), data_type, raw_data)
  }

  pub fn header(&self) -> &Header {
    &self.header
  }

  pub fn mandatory(&self) -> &MandatoryKeywords {
    &self.mandatory
  }

  pub fn data_type(&self) -> DataType {
    self.data_type
  }

  pub fn raw_data(&self) -> &[u8] {
    &self.raw_data
  }

  pub fn data_array_length_bits(&self) -> u64 {
    self.data_array_length_bits
  }

  pub fn data_array_length_bytes(&self) -> u64 {
    self.data_array_length_bits / 8
  }

  /// Append a `HISTORY` record to the header.
  pub fn append_history(&mut self, text: &str) -> Result<usize, Error> {
    self.header.append_history(text)
  }

  /// `BZERO` and `BSCALE`, or their defaults.
  pub fn scaling(&self) -> ImageScaling {
    self.header.bind::<ImageScaling>().into_value()
  }

  /// Physical values of the image, addressed `[[x, y]]`.
  pub fn decode_image(&self) -> Result<Array2<f64>, Error> {
    image::decode(
      &self.raw_data,
      self.mandatory.bitpix_checked()?,
      &self.mandatory.length_of_axis,
      &self.scaling(),
    )
  }

  pub fn into_parts(self) -> (Header, Vec<u8>) {
    (self.header, self.raw_data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::common::kwrecord::HeaderRecord;

  #[test]
  fn test_new_image() {
    let mut hdu = HeaderDataUnit::new_image(BitPix::I16, vec![2, 2], vec![0, 1, 0, 2, 0, 3, 0, 4])
      .unwrap();
    assert_eq!(hdu.data_type(), DataType::Image);
    assert_eq!(hdu.data_array_length_bits(), 64);
    assert_eq!(hdu.data_array_length_bytes(), 8);
    assert_eq!(hdu.header().lookup("NAXIS2"), Some("2"));

    hdu.append_history("scaled").unwrap();
    assert_eq!(hdu.header().len(), 6);
    let img = hdu.decode_image().unwrap();
    assert_eq!(img[[1, 1]], 4.0);

    assert!(HeaderDataUnit::new_image(BitPix::I16, vec![2, 2], vec![0; 7]).is_err());
    assert!(HeaderDataUnit::new_image(BitPix::I16, vec![2, 2], vec![0; 9]).is_err());
  }

  #[test]
  fn test_decode_with_scaling() {
    let mut header =
      Header::create_minimal_primary_header(&PrimaryMandatoryKeywords::new(BitPix::U8, vec![2, 1]))
        .unwrap();
    header.append(HeaderRecord::real("BZERO", 10.0, None).unwrap());
    header.append(HeaderRecord::real("BSCALE", 2.0, None).unwrap());
    let mandatory = header.bind::<MandatoryKeywords>().into_value();
    let hdu = HeaderDataUnit::new(header, mandatory, DataType::Image, vec![1, 2]).unwrap();
    let img = hdu.decode_image().unwrap();
    assert_eq!(img[[0, 0]], 12.0);
    assert_eq!(img[[1, 0]], 14.0);
  }

  #[test]
  fn test_empty_primary() {
    let hdu = HeaderDataUnit::new_image(BitPix::U8, vec![], vec![]).unwrap();
    assert_eq!(hdu.data_type(), DataType::None);
    assert_eq!(hdu.data_array_length_bits(), 0);
    assert!(hdu.decode_image().is_err());
  }

  #[test]
  fn test_new_image_overflow() {
    let err = HeaderDataUnit::new_image(BitPix::F64, vec![1 << 32, 1 << 32], vec![]).unwrap_err();
    assert!(matches!(*err, crate::error::FitsError::DataArrayOverflow { .. }));
  }
}
