//! Typed values of well known keywords.

pub mod bitpix;
