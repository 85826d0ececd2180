//! Logical reads over a stream of 2880 bytes blocks.

use std::io::{ErrorKind, Read};

use log::trace;

use crate::{
  common::{BLOCK_LEN, RECORD_LEN, record::Record},
  error::{Error, new_incomplete_block_err, new_io_err, new_non_ascii_record_err},
};

/// Reads a source block by block, serving logical reads of any length across block boundaries.
/// The source is borrowed, never closed.
pub struct BlockReader<'a, R: Read> {
  source: &'a mut R,
  block: Box<[u8; BLOCK_LEN]>,
  /// Position of the next byte to be read in `block`, `BLOCK_LEN` if the block is consumed or stale.
  cursor: usize,
  blocks_read: u64,
}

impl<'a, R: Read> BlockReader<'a, R> {
  pub fn new(source: &'a mut R) -> Self {
    Self {
      source,
      block: Box::new([0; BLOCK_LEN]),
      cursor: BLOCK_LEN,
      blocks_read: 0,
    }
  }

  /// Pull exactly one block from the source, whatever the position in the current block.
  /// The returned block is considered fully consumed.
  ///
  /// # Errors
  /// `IncompleteBlock` if the source yields less than 2880 bytes (`found: 0` at end of stream).
  pub fn read_block(&mut self) -> Result<&[u8; BLOCK_LEN], Error> {
    self.fill_block()?;
    self.cursor = BLOCK_LEN;
    Ok(&self.block)
  }

  fn fill_block(&mut self) -> Result<(), Error> {
    let mut found = 0;
    while found < BLOCK_LEN {
      match self.source.read(&mut self.block[found..]) {
        Ok(0) => break,
        Ok(n) => found += n,
        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
        Err(e) => return Err(new_io_err(e)),
      }
    }
    if found < BLOCK_LEN {
      // The stale content must not be served
      self.cursor = BLOCK_LEN;
      return Err(new_incomplete_block_err(BLOCK_LEN, found));
    }
    self.cursor = 0;
    self.blocks_read += 1;
    trace!("Block {} read.", self.blocks_read);
    Ok(())
  }

  /// Fill `dest` entirely, reading new blocks as needed.
  pub fn read_into(&mut self, dest: &mut [u8]) -> Result<(), Error> {
    let mut filled = 0;
    while filled < dest.len() {
      if self.cursor == BLOCK_LEN {
        self.fill_block()?;
      }
      let n = (dest.len() - filled).min(BLOCK_LEN - self.cursor);
      dest[filled..filled + n].copy_from_slice(&self.block[self.cursor..self.cursor + n]);
      self.cursor += n;
      filled += n;
    }
    Ok(())
  }

  /// Read exactly `n` bytes.
  /// The buffer grows one block at a time, so a size declared by a header but not
  /// backed by the stream fails with `IncompleteBlock` without allocating `n` bytes.
  pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::with_capacity(n.min(BLOCK_LEN));
    while bytes.len() < n {
      if self.cursor == BLOCK_LEN {
        self.fill_block()?;
      }
      let run = (n - bytes.len()).min(BLOCK_LEN - self.cursor);
      bytes.extend_from_slice(&self.block[self.cursor..self.cursor + run]);
      self.cursor += run;
    }
    Ok(bytes)
  }

  /// Read exactly `n` ASCII characters.
  pub fn read_text(&mut self, n: usize) -> Result<String, Error> {
    let bytes = self.read_bytes(n)?;
    if bytes.is_ascii() {
      String::from_utf8(bytes).map_err(|e| new_non_ascii_record_err(e.as_bytes()))
    } else {
      Err(new_non_ascii_record_err(&bytes))
    }
  }

  /// Read the next 80 bytes record.
  pub fn read_record(&mut self) -> Result<Record, Error> {
    let mut bytes = [0; RECORD_LEN];
    self.read_into(&mut bytes).map(|()| Record::from_array(bytes))
  }

  /// Discard the remaining bytes of the current block, if it is partially consumed.
  /// Returns the number of discarded bytes.
  pub fn move_to_block_boundary(&mut self) -> usize {
    let discarded = match self.cursor {
      0 => 0,
      c => BLOCK_LEN - c,
    };
    if discarded > 0 {
      trace!("{} bytes skipped to reach the block boundary.", discarded);
      self.cursor = BLOCK_LEN;
    }
    discarded
  }

  /// Number of bytes not yet consumed in the current block, 0 if no block is loaded.
  pub fn block_bytes_remaining(&self) -> usize {
    BLOCK_LEN - self.cursor
  }

  pub fn blocks_read(&self) -> u64 {
    self.blocks_read
  }

  /// Total number of bytes served so far (discarded ones included).
  pub fn position(&self) -> u64 {
    self.blocks_read * BLOCK_LEN as u64 - self.block_bytes_remaining() as u64
  }
}
