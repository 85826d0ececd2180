//! Decode the data array of an image HDU into physical values.

use ndarray::{Array2, ShapeBuilder};

use crate::{
  common::keywords::bitpix::BitPix,
  error::{
    Error, new_custom, new_data_array_overflow_err, new_truncated_data_err,
    new_unsupported_dims_err,
  },
  hdu::header::mandatory::ImageScaling,
};

/// Decode the big-endian samples of `raw` into `BZERO + BSCALE x sample` values.
/// The result is addressed `[[x, y]]`, `x` spanning axis 1 (varying fastest in `raw`)
/// and `y` spanning axis 2.
///
/// # Errors
/// * no axis, or more than one plane (an axis above 2 longer than 1);
/// * data array size not fitting in a `usize`;
/// * `raw` shorter than the data array.
pub fn decode(
  raw: &[u8],
  bitpix: BitPix,
  length_of_axis: &[u64],
  scaling: &ImageScaling,
) -> Result<Array2<f64>, Error> {
  let (nx, ny) = plane_shape(length_of_axis)?;
  let sample_len = bitpix.byte_size();
  let expected = nx
    .checked_mul(ny)
    .and_then(|n| n.checked_mul(sample_len))
    .ok_or_else(|| new_data_array_overflow_err(bitpix.i16_value() as i64, length_of_axis))?;
  if raw.len() < expected {
    return Err(new_truncated_data_err(expected, raw.len()));
  }
  let values: Vec<f64> = raw[..expected]
    .chunks_exact(sample_len)
    .map(|sample| scaling.apply(bitpix.read_sample(sample)))
    .collect();
  // Column-major (Fortran) order: the first index varies fastest.
  Array2::from_shape_vec((nx, ny).f(), values).map_err(|e| new_custom(e.to_string()))
}

/// `(NAXIS1, NAXIS2)`, with `NAXIS2 = 1` for a single axis.
fn plane_shape(length_of_axis: &[u64]) -> Result<(usize, usize), Error> {
  let to_usize = |n: u64| usize::try_from(n).map_err(|_| new_unsupported_dims_err(length_of_axis));
  match length_of_axis {
    [nx] => Ok((to_usize(*nx)?, 1)),
    [nx, ny, others @ ..] if others.iter().all(|n| *n == 1) => Ok((to_usize(*nx)?, to_usize(*ny)?)),
    _ => Err(new_unsupported_dims_err(length_of_axis)),
  }
}
