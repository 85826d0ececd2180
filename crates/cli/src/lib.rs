extern crate log;

pub mod copy;
pub mod head;
pub mod info;
