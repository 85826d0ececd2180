//! Typed projections of header keywords, populated by the binder.

use crate::{
  common::{BITPIX, NAXIS, SIMPLE, keywords::bitpix::BitPix},
  error::{Error, new_data_array_overflow_err},
  hdu::header::{
    Header,
    bind::{BindKeywords, FieldBinding, KeywordSource, assign, push},
  },
};

/// Common accessors of the keywords fixing the size of a data array.
pub trait DataArrayGeometry {
  /// Raw `BITPIX` value.
  fn bitpix(&self) -> i64;

  /// `NAXIS1` to `NAXISn` values, `[0]` being the length of axis 1.
  fn length_of_axis(&self) -> &[u64];

  /// `|BITPIX| x NAXIS1 x ... x NAXISn`, 0 if there is no axis.
  ///
  /// # Errors
  /// `DataArrayOverflow` if the product does not fit in a `u64`.
  fn data_array_length_bits(&self) -> Result<u64, Error> {
    let axes = self.length_of_axis();
    if axes.is_empty() {
      return Ok(0);
    }
    axes
      .iter()
      .try_fold(self.bitpix().unsigned_abs(), |acc, n| acc.checked_mul(*n))
      .ok_or_else(|| new_data_array_overflow_err(self.bitpix(), axes))
  }

  fn data_array_length_bytes(&self) -> Result<u64, Error> {
    self.data_array_length_bits().map(|bits| bits / 8)
  }

  fn bitpix_checked(&self) -> Result<BitPix, Error> {
    BitPix::from_value(self.bitpix())
  }
}

/// `BITPIX`, `NAXIS` and `NAXISn`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MandatoryKeywords {
  pub bitpix: i64,
  pub number_of_axes: u16,
  pub length_of_axis: Vec<u64>,
}

impl BindKeywords for MandatoryKeywords {
  const FIELDS: &'static [FieldBinding<Self>] = &[
    FieldBinding::scalar(
      "bitpix",
      &[KeywordSource::new(BITPIX, 1)],
      |k: &mut MandatoryKeywords, raw: &str| assign(&mut k.bitpix, raw),
    ),
    FieldBinding::scalar(
      "number_of_axes",
      &[KeywordSource::new(NAXIS, 1)],
      |k: &mut MandatoryKeywords, raw: &str| assign(&mut k.number_of_axes, raw),
    ),
    FieldBinding::collection(
      "length_of_axis",
      &[KeywordSource::indexed(NAXIS, 1)],
      |k: &mut MandatoryKeywords, raw: &str| push(&mut k.length_of_axis, raw),
    ),
  ];
}

impl DataArrayGeometry for MandatoryKeywords {
  fn bitpix(&self) -> i64 {
    self.bitpix
  }

  fn length_of_axis(&self) -> &[u64] {
    &self.length_of_axis
  }
}

impl From<PrimaryMandatoryKeywords> for MandatoryKeywords {
  fn from(primary: PrimaryMandatoryKeywords) -> Self {
    Self {
      bitpix: primary.bitpix,
      number_of_axes: primary.number_of_axes,
      length_of_axis: primary.length_of_axis,
    }
  }
}

/// `SIMPLE`, `BITPIX`, `NAXIS` and `NAXISn`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryMandatoryKeywords {
  pub simple: bool,
  pub bitpix: i64,
  pub number_of_axes: u16,
  pub length_of_axis: Vec<u64>,
}

impl PrimaryMandatoryKeywords {
  /// Keywords of a standard conforming primary HDU having the given axes.
  pub fn new(bitpix: BitPix, length_of_axis: Vec<u64>) -> Self {
    Self {
      simple: true,
      bitpix: bitpix.i16_value() as i64,
      number_of_axes: length_of_axis.len() as u16,
      length_of_axis,
    }
  }

  pub fn to_header(&self) -> Result<Header, Error> {
    Header::create_minimal_primary_header(self)
  }
}

impl BindKeywords for PrimaryMandatoryKeywords {
  const FIELDS: &'static [FieldBinding<Self>] = &[
    FieldBinding::scalar(
      "simple",
      &[KeywordSource::new(SIMPLE, 1)],
      |k: &mut PrimaryMandatoryKeywords, raw: &str| assign(&mut k.simple, raw),
    ),
    FieldBinding::scalar(
      "bitpix",
      &[KeywordSource::new(BITPIX, 1)],
      |k: &mut PrimaryMandatoryKeywords, raw: &str| assign(&mut k.bitpix, raw),
    ),
    FieldBinding::scalar(
      "number_of_axes",
      &[KeywordSource::new(NAXIS, 1)],
      |k: &mut PrimaryMandatoryKeywords, raw: &str| assign(&mut k.number_of_axes, raw),
    ),
    FieldBinding::collection(
      "length_of_axis",
      &[KeywordSource::indexed(NAXIS, 1)],
      |k: &mut PrimaryMandatoryKeywords, raw: &str| push(&mut k.length_of_axis, raw),
    ),
  ];
}

impl DataArrayGeometry for PrimaryMandatoryKeywords {
  fn bitpix(&self) -> i64 {
    self.bitpix
  }

  fn length_of_axis(&self) -> &[u64] {
    &self.length_of_axis
  }
}

/// Affine transformation from raw samples to physical values: `BZERO + BSCALE x raw`.
/// Bound from the upper cased field names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScaling {
  pub bzero: f64,
  pub bscale: f64,
}

impl ImageScaling {
  pub fn new(bzero: f64, bscale: f64) -> Self {
    Self { bzero, bscale }
  }

  pub fn apply(&self, raw: f64) -> f64 {
    self.bzero + self.bscale * raw
  }

  pub fn is_identity(&self) -> bool {
    self.bzero == 0.0 && self.bscale == 1.0
  }
}

impl Default for ImageScaling {
  fn default() -> Self {
    Self::new(0.0, 1.0)
  }
}

impl BindKeywords for ImageScaling {
  const FIELDS: &'static [FieldBinding<Self>] = &[
    FieldBinding::scalar("bzero", &[], |s: &mut ImageScaling, raw: &str| {
      assign(&mut s.bzero, raw)
    }),
    FieldBinding::scalar("bscale", &[], |s: &mut ImageScaling, raw: &str| {
      assign(&mut s.bscale, raw)
    }),
  ];
}

/// All `HISTORY` and `COMMENT` texts, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commentary {
  pub history: Vec<String>,
  pub comment: Vec<String>,
}

impl BindKeywords for Commentary {
  const FIELDS: &'static [FieldBinding<Self>] = &[
    FieldBinding::collection("history", &[], |c: &mut Commentary, raw: &str| {
      push(&mut c.history, raw)
    }),
    FieldBinding::collection("comment", &[], |c: &mut Commentary, raw: &str| {
      push(&mut c.comment, raw)
    }),
  ];
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::common::kwrecord::HeaderRecord;

  fn sif_header() -> Header {
    let mut header =
      Header::create_minimal_primary_header(&PrimaryMandatoryKeywords::new(BitPix::U8, vec![16, 16]))
        .unwrap();
    header.append(HeaderRecord::end());
    header
  }

  #[test]
  fn test_bind_primary_mandatory() {
    let bound = sif_header().bind::<PrimaryMandatoryKeywords>();
    assert!(bound.is_clean());
    let mandatory = bound.into_value();
    assert!(mandatory.simple);
    assert_eq!(mandatory.bitpix, 8);
    assert_eq!(mandatory.number_of_axes, 2);
    assert_eq!(mandatory.length_of_axis, vec![16, 16]);
    assert_eq!(mandatory.data_array_length_bits().unwrap(), 2048);
    assert_eq!(mandatory.data_array_length_bytes().unwrap(), 256);
    assert_eq!(mandatory.bitpix_checked().unwrap(), BitPix::U8);
  }

  #[test]
  fn test_bind_mandatory() {
    let mandatory = sif_header().bind::<MandatoryKeywords>().into_value();
    assert_eq!(
      mandatory,
      MandatoryKeywords {
        bitpix: 8,
        number_of_axes: 2,
        length_of_axis: vec![16, 16]
      }
    );
  }

  #[test]
  fn test_no_axis() {
    let mandatory = PrimaryMandatoryKeywords::new(BitPix::F64, vec![]);
    assert_eq!(mandatory.number_of_axes, 0);
    assert_eq!(mandatory.data_array_length_bits().unwrap(), 0);
    let header = mandatory.to_header().unwrap();
    assert_eq!(header.bind::<PrimaryMandatoryKeywords>().into_value(), mandatory);
  }

  #[test]
  fn test_data_array_length_overflow() {
    let mandatory = MandatoryKeywords {
      bitpix: -64,
      number_of_axes: 2,
      length_of_axis: vec![1 << 32, 1 << 32],
    };
    let err = mandatory.data_array_length_bits().unwrap_err();
    assert!(matches!(*err, crate::error::FitsError::DataArrayOverflow { bitpix: -64, .. }));

    let mandatory = MandatoryKeywords {
      bitpix: 8,
      number_of_axes: 2,
      length_of_axis: vec![u64::MAX / 8, 1],
    };
    assert_eq!(mandatory.data_array_length_bits().unwrap(), u64::MAX - 7);
    assert!(mandatory.data_array_length_bytes().is_ok());
  }

  #[test]
  fn test_bind_scaling() {
    let mut header = sif_header();
    assert!(header.bind::<ImageScaling>().into_value().is_identity());

    header.append(HeaderRecord::real("BZERO", 32768.0, None).unwrap());
    header.append(HeaderRecord::create("BSCALE", Some("2.0D0"), None).unwrap());
    let scaling = header.bind::<ImageScaling>().into_value();
    assert_eq!(scaling, ImageScaling::new(32768.0, 2.0));
    assert_eq!(scaling.apply(-1.0), 32766.0);
  }

  #[test]
  fn test_bind_commentary() {
    let mut header = sif_header();
    header.append_history("created").unwrap();
    header.append_comment("a comment").unwrap();
    header.append_history("copied").unwrap();
    let commentary = header.bind::<Commentary>().into_value();
    assert_eq!(commentary.history, vec!["created", "copied"]);
    assert_eq!(commentary.comment, vec!["a comment"]);
  }
}
