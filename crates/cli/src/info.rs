use std::{error::Error, fs::File, path::PathBuf};

use clap::Args;
use log::{info, warn};
use memmap2::MmapOptions;

use fitsblock::{DataType, FitsReader, HeaderDataUnit};

#[derive(Debug, Clone, Args)]
pub struct Info {
  /// Path of the input file.
  #[clap(value_name = "FILE")]
  pub input: PathBuf,
  /// Do not decode the images to compute the range of their physical values.
  #[clap(short = 'n', long)]
  pub no_stats: bool,
}

impl Info {
  pub fn exec(self) -> Result<(), Box<dyn Error>> {
    info!("Open file {:?}", &self.input);
    let file = File::open(&self.input)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let mut bytes: &[u8] = mmap.as_ref();
    let mut reader = FitsReader::new(&mut bytes);
    let mut i = 0;
    while let Some(hdu) = reader.read_next_header_data_unit()? {
      self.print_hdu_info(i, &hdu);
      i += 1;
    }
    println!("{} HDU(s), {} bytes.", i, reader.position());
    Ok(())
  }

  fn print_hdu_info(&self, i: usize, hdu: &HeaderDataUnit) {
    let mandatory = hdu.mandatory();
    let axes = mandatory
      .length_of_axis
      .iter()
      .map(|n| n.to_string())
      .collect::<Vec<String>>()
      .join(" x ");
    println!(
      "HDU[{}]: {:?}; {} records; BITPIX: {}; NAXIS: {} [{}]; data: {} bytes.",
      i,
      hdu.data_type(),
      hdu.header().len(),
      mandatory.bitpix,
      mandatory.number_of_axes,
      axes,
      hdu.data_array_length_bytes()
    );
    if self.no_stats || hdu.data_type() != DataType::Image {
      return;
    }
    let scaling = hdu.scaling();
    if !scaling.is_identity() {
      println!("  BZERO: {}; BSCALE: {}", scaling.bzero, scaling.bscale);
    }
    match hdu.decode_image() {
      Ok(img) => {
        let (min, max) = img
          .iter()
          .filter(|v| !v.is_nan())
          .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(*v), max.max(*v))
          });
        println!("  {} x {} image; values in [{}, {}].", img.nrows(), img.ncols(), min, max);
      }
      Err(e) => warn!("HDU[{}] not decoded: {}", i, e),
    }
  }
}
