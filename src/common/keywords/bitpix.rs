//! Defines the `BITPIX` keyword.

use crate::error::{Error, new_unsupported_bitpix_err};

/// Data element type, from the signed bit depth of the `BITPIX` keyword.
/// Negative values denote IEEE-754 floating point.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BitPix {
  U8 = 8,
  I16 = 16,
  I32 = 32,
  I64 = 64,
  F32 = -32,
  F64 = -64,
}

impl BitPix {
  /// Fails for any value not in `[8, 16, 32, 64, -32, -64]`.
  pub fn from_value(value: i64) -> Result<Self, Error> {
    match value {
      8 => Ok(Self::U8),
      16 => Ok(Self::I16),
      32 => Ok(Self::I32),
      64 => Ok(Self::I64),
      -32 => Ok(Self::F32),
      -64 => Ok(Self::F64),
      _ => Err(new_unsupported_bitpix_err(value)),
    }
  }

  /// Returns the BitPx value associated to this BitPix enum.
  pub const fn i16_value(&self) -> i16 {
    *self as i16
  }

  /// Return the size, in bits, of the data value this BitPix is associated with.
  pub const fn bit_size(&self) -> u64 {
    self.i16_value().unsigned_abs() as u64
  }

  /// Return the size, in bytes, of the data value this BitPix is associated with.
  pub const fn byte_size(&self) -> usize {
    (self.i16_value().unsigned_abs() >> 3) as usize
  }

  pub const fn is_float(&self) -> bool {
    self.i16_value() < 0
  }

  /// Decode one big-endian sample.
  /// # Warning
  /// `bytes` must contain exactly `byte_size()` bytes.
  pub fn read_sample(&self, bytes: &[u8]) -> f64 {
    debug_assert_eq!(bytes.len(), self.byte_size());
    match self {
      Self::U8 => bytes[0] as f64,
      Self::I16 => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
      Self::I32 => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
      Self::I64 => {
        let mut buf = [0_u8; 8];
        buf.copy_from_slice(bytes);
        i64::from_be_bytes(buf) as f64
      }
      Self::F32 => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
      Self::F64 => {
        let mut buf = [0_u8; 8];
        buf.copy_from_slice(bytes);
        f64::from_be_bytes(buf)
      }
    }
  }
}

impl TryFrom<i64> for BitPix {
  type Error = Error;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    Self::from_value(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_value() {
    for bitpix in [
      BitPix::U8,
      BitPix::I16,
      BitPix::I32,
      BitPix::I64,
      BitPix::F32,
      BitPix::F64,
    ] {
      assert_eq!(BitPix::from_value(bitpix.i16_value() as i64).unwrap(), bitpix);
      assert_eq!(bitpix.byte_size() * 8, bitpix.bit_size() as usize);
    }
    assert!(BitPix::from_value(12).is_err());
    assert!(BitPix::from_value(0).is_err());
  }

  #[test]
  fn test_read_sample() {
    assert_eq!(BitPix::U8.read_sample(&[255]), 255.0);
    assert_eq!(BitPix::I16.read_sample(&(-2_i16).to_be_bytes()), -2.0);
    assert_eq!(BitPix::I32.read_sample(&70000_i32.to_be_bytes()), 70000.0);
    assert_eq!(BitPix::I64.read_sample(&(-5_i64).to_be_bytes()), -5.0);
    assert_eq!(BitPix::F32.read_sample(&1.5_f32.to_be_bytes()), 1.5);
    assert_eq!(BitPix::F64.read_sample(&(-0.25_f64).to_be_bytes()), -0.25);
  }
}
