extern crate fitsblock_cli;

use std::error::Error;

use clap::Parser;

use fitsblock_cli::{copy::CopyFile, head::Head, info::Info};

// Avoid musl's default allocator due to lackluster performance
// https://nickb.dev/blog/default-musl-allocator-considered-harmful-to-performance
#[cfg(all(target_env = "musl", target_arch = "x86_64"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Read, inspect and copy single image FITS files on the command line.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Args {
  /// Read and print the headers of all the HDUs in a FITS file
  #[clap(name = "head")]
  Head(Head),
  /// Print the structure of each HDU, and the range of the image values
  #[clap(name = "info")]
  Info(Info),
  /// Copy a FITS file, adding a HISTORY record to the primary header
  #[clap(name = "copy")]
  Copy(CopyFile),
}

impl Args {
  fn exec(self) -> Result<(), Box<dyn Error>> {
    match self {
      Self::Head(args) => args.exec(),
      Self::Info(args) => args.exec(),
      Self::Copy(args) => args.exec(),
    }
  }
}

fn main() -> Result<(), Box<dyn Error>> {
  env_logger::init();
  let args = Args::parse();
  match args.exec() {
    Ok(()) => Ok(()),
    Err(e) => {
      eprintln!("Error: {}", e);
      Err(e)
    }
  }
}
