//! Block-oriented streaming codec of FITS files:
//! * [`common`]: the layout rules and the 80 characters keyword record grammar;
//! * [`hdu`]: the header aggregate, the keyword binder and the HDU (with its image decoder);
//! * [`read`]: reading HDUs from any `Read`;
//! * [`write`]: writing HDUs to any `Write`, block by block.

pub mod common;
pub mod error;
pub mod hdu;
pub mod read;
pub mod write;

pub use common::{keywords::bitpix::BitPix, kwrecord::HeaderRecord, record::Record};
pub use error::{Error, FitsError};
pub use hdu::{DataType, HeaderDataUnit, header::Header};
pub use read::stream::FitsReader;
pub use write::{FitsWriter, WriterState};
