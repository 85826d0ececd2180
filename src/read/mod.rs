//! Reading FITS streams: the block layer and the HDU reader built on it.

pub mod block;
pub mod stream;
