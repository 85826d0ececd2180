use std::{error::Error, fs::File, io::BufWriter, path::PathBuf};

use clap::Args;
use log::info;
use memmap2::MmapOptions;

use fitsblock::{FitsReader, FitsWriter};

#[derive(Debug, Clone, Args)]
pub struct CopyFile {
  /// Path of the input file.
  #[clap(value_name = "FILE")]
  pub input: PathBuf,
  /// Path of the output file.
  #[clap(value_name = "OUTPUT")]
  pub output: PathBuf,
  /// Text of the HISTORY record added to the primary header.
  #[clap(long, default_value = "Copied by fitsblock")]
  pub history: String,
  /// Only copy the primary HDU.
  #[clap(short = 'p', long)]
  pub primary: bool,
}

impl CopyFile {
  pub fn exec(self) -> Result<(), Box<dyn Error>> {
    let file = File::open(&self.input)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let mut bytes: &[u8] = mmap.as_ref();
    let mut reader = FitsReader::new(&mut bytes);

    let mut primary = reader.read_primary_header_data_unit()?;
    primary.append_history(&self.history)?;

    let mut writer = FitsWriter::new(BufWriter::new(File::create(&self.output)?));
    writer.write_header_data_unit(&primary)?;
    let mut n_hdu = 1;
    if !self.primary {
      while let Some(hdu) = reader.read_next_header_data_unit()? {
        writer.write_header_data_unit(&hdu)?;
        n_hdu += 1;
      }
    }
    info!(
      "{} HDU(s) copied from {:?} to {:?} ({} bytes).",
      n_hdu,
      &self.input,
      &self.output,
      writer.bytes_written()
    );
    writer.close().map_err(|e| e.into())
  }
}
