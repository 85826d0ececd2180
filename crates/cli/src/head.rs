use std::{error::Error, fs::File, path::PathBuf};

use clap::Args;
use memmap2::MmapOptions;

use fitsblock::{FitsReader, HeaderDataUnit};

#[derive(Debug, Clone, Args)]
pub struct Head {
  /// Path of the input file.
  #[clap(value_name = "FILE")]
  pub input: PathBuf,
  /// Only print the header of the primary HDU.
  #[clap(short = 'p', long)]
  pub primary: bool,
}

impl Head {
  pub fn exec(self) -> Result<(), Box<dyn Error>> {
    let file = File::open(&self.input)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let mut bytes: &[u8] = mmap.as_ref();
    let mut reader = FitsReader::new(&mut bytes);
    if self.primary {
      let header = reader.read_primary_header()?;
      println!("HDU[0]:");
      for record in &header {
        println!("{}", record);
      }
    } else {
      let mut i = 0;
      while let Some(hdu) = reader.read_next_header_data_unit()? {
        print_hdu_header(i, &hdu);
        i += 1;
      }
    }
    Ok(())
  }
}

fn print_hdu_header(i: usize, hdu: &HeaderDataUnit) {
  println!("HDU[{}]:", i);
  for record in hdu.header() {
    println!("{}", record);
  }
  println!();
}
