//! Writing FITS streams, block by block, under the control of a phase state machine:
//!
//! ```text
//! PrimaryHeader --end_header--> PrimaryData --write_data_array--> SecondaryHeader --end_header--> SecondaryData ...
//! ```

use std::io::Write;

use log::{debug, trace, warn};

use crate::{
  common::{BLOCK_LEN, DATA_PAD, HEADER_PAD, block_padding, kwrecord::HeaderRecord, record::Record},
  error::{Error, new_custom, new_io_err, new_phase_violation_err},
  hdu::{HeaderDataUnit, header::Header},
};

/// Phase of a [`FitsWriter`], governing the legal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
  PrimaryHeader,
  PrimaryData,
  SecondaryHeader,
  SecondaryData,
}

impl WriterState {
  pub fn is_header(&self) -> bool {
    matches!(self, Self::PrimaryHeader | Self::SecondaryHeader)
  }

  pub fn is_data(&self) -> bool {
    !self.is_header()
  }

  /// Space in header blocks, NUL in data blocks.
  pub fn pad_byte(&self) -> u8 {
    if self.is_header() { HEADER_PAD } else { DATA_PAD }
  }

  fn next(self) -> Self {
    match self {
      Self::PrimaryHeader => Self::PrimaryData,
      Self::PrimaryData => Self::SecondaryHeader,
      Self::SecondaryHeader => Self::SecondaryData,
      Self::SecondaryData => Self::SecondaryHeader,
    }
  }
}

/// Writes HDUs to an owned destination.
/// Header records and data bytes are buffered in a block which is written when full,
/// so that the destination only receives whole blocks (raw data arrays aside).
///
/// The destination is released by [`FitsWriter::close`] or [`FitsWriter::finish`]; if the
/// writer is dropped before, a pending block is flushed on a best effort basis.
pub struct FitsWriter<W: Write> {
  writer: Option<W>,
  state: WriterState,
  block: Box<[u8; BLOCK_LEN]>,
  /// Number of bytes already in `block`.
  position: usize,
  /// Records of the header in progress (or of the last header until its data is written).
  header: Header,
  end_written: bool,
  bytes_written: u64,
}

impl<W: Write> FitsWriter<W> {
  pub fn new(writer: W) -> Self {
    Self {
      writer: Some(writer),
      state: WriterState::PrimaryHeader,
      block: Box::new([HEADER_PAD; BLOCK_LEN]),
      position: 0,
      header: Header::new(),
      end_written: false,
      bytes_written: 0,
    }
  }

  pub fn state(&self) -> WriterState {
    self.state
  }

  /// Records written in the current HDU header.
  pub fn header(&self) -> &Header {
    &self.header
  }

  /// Number of bytes delivered to the destination.
  pub fn bytes_written(&self) -> u64 {
    self.bytes_written
  }

  /// Number of bytes waiting in the current block.
  pub fn pending_bytes(&self) -> usize {
    self.position
  }

  /// Write a keyword record in the current header.
  ///
  /// # Errors
  /// Phase violation in a data state, or after the `END` record.
  pub fn write_header_record(&mut self, record: HeaderRecord) -> Result<(), Error> {
    self.check_header_state("write_header_record")?;
    self.push_bytes(record.record().as_bytes())?;
    if record.is_end() {
      self.end_written = true;
    }
    self.header.append(record);
    Ok(())
  }

  /// Write a raw record in the current header, without parsing it.
  pub fn write_record(&mut self, record: &Record) -> Result<(), Error> {
    self.check_header_state("write_record")?;
    self.push_bytes(record.as_bytes())?;
    if record == HeaderRecord::end().record() {
      self.end_written = true;
    }
    Ok(())
  }

  /// Write one byte of the current data array.
  pub fn write_data_byte(&mut self, byte: u8) -> Result<(), Error> {
    if self.state.is_header() {
      return Err(new_phase_violation_err(
        "write_data_byte",
        self.state,
        "the header is not ended",
      ));
    }
    self.push_bytes(&[byte])
  }

  /// Write the `END` record if not already done, write the last header block (space padded)
  /// and enter the data phase.
  pub fn end_header(&mut self) -> Result<(), Error> {
    if self.state.is_header() {
      if !self.end_written {
        self.write_header_record(HeaderRecord::end())?;
      }
      self.flush_block()?;
      self.transition();
      Ok(())
    } else {
      Err(new_phase_violation_err(
        "end_header",
        self.state,
        "no header in progress",
      ))
    }
  }

  /// Write the current block, padded with the pad byte of the current phase.
  /// Does nothing if the block is empty.
  pub fn flush_block(&mut self) -> Result<(), Error> {
    if self.position == 0 {
      return Ok(());
    }
    let pad = self.state.pad_byte();
    self.block[self.position..].fill(pad);
    self.write_block()
  }

  /// Write the whole data array directly to the destination, pad it with NUL up to the next
  /// block boundary, and enter the next header phase.
  ///
  /// # Errors
  /// Phase violation in a header state, or if data bytes are pending in the block buffer.
  pub fn write_data_array(&mut self, data: &[u8]) -> Result<(), Error> {
    if self.state.is_header() {
      return Err(new_phase_violation_err(
        "write_data_array",
        self.state,
        "the header is not ended",
      ));
    }
    if self.position != 0 {
      return Err(new_phase_violation_err(
        "write_data_array",
        self.state,
        "data bytes are pending in the block buffer",
      ));
    }
    let padding = vec![DATA_PAD; block_padding(data.len())];
    let writer = self.writer.as_mut().ok_or_else(closed_err)?;
    writer
      .write_all(data)
      .and_then(|()| writer.write_all(&padding))
      .map_err(new_io_err)?;
    self.bytes_written += (data.len() + padding.len()) as u64;
    trace!("Data array of {} bytes written.", data.len());
    self.transition();
    Ok(())
  }

  /// Terminate a data array written byte by byte: write the last (NUL padded) block
  /// and enter the next header phase.
  pub fn end_data(&mut self) -> Result<(), Error> {
    if self.state.is_data() {
      self.flush_block()?;
      self.transition();
      Ok(())
    } else {
      Err(new_phase_violation_err(
        "end_data",
        self.state,
        "no data array in progress",
      ))
    }
  }

  /// Write a full HDU: its header records, `END`, and its data array.
  /// An `END` record of the header is held back, so that records appended after it
  /// (e.g. `HISTORY`) are written before the final `END`.
  pub fn write_header_data_unit(&mut self, hdu: &HeaderDataUnit) -> Result<(), Error> {
    self.check_header_state("write_header_data_unit")?;
    for record in hdu.header().iter().filter(|r| !r.is_end()) {
      self.write_header_record(record.clone())?;
    }
    self.end_header()?;
    self.write_data_array(hdu.raw_data())
  }

  /// Flush the pending block and release the destination.
  pub fn close(self) -> Result<(), Error> {
    self.finish().map(|_| ())
  }

  /// Flush the pending block and return the destination.
  pub fn finish(mut self) -> Result<W, Error> {
    self.flush_block()?;
    let mut writer = self.writer.take().ok_or_else(closed_err)?;
    writer.flush().map_err(new_io_err)?;
    debug!("Writer closed after {} bytes.", self.bytes_written);
    Ok(writer)
  }

  fn check_header_state(&self, operation: &'static str) -> Result<(), Error> {
    if self.state.is_data() {
      Err(new_phase_violation_err(
        operation,
        self.state,
        "the header is already ended",
      ))
    } else if self.end_written {
      Err(new_phase_violation_err(
        operation,
        self.state,
        "the END record is already written",
      ))
    } else {
      Ok(())
    }
  }

  fn push_bytes(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
    while !bytes.is_empty() {
      let n = bytes.len().min(BLOCK_LEN - self.position);
      self.block[self.position..self.position + n].copy_from_slice(&bytes[..n]);
      self.position += n;
      bytes = &bytes[n..];
      if self.position == BLOCK_LEN {
        self.write_block()?;
      }
    }
    Ok(())
  }

  /// The block is consumed even if the write fails: it is never sent twice.
  fn write_block(&mut self) -> Result<(), Error> {
    let writer = self.writer.as_mut().ok_or_else(closed_err)?;
    self.position = 0;
    writer.write_all(self.block.as_slice()).map_err(new_io_err)?;
    self.bytes_written += BLOCK_LEN as u64;
    trace!("Block written ({} bytes so far).", self.bytes_written);
    Ok(())
  }

  fn transition(&mut self) {
    let next = self.state.next();
    debug!("Writer state: {:?} -> {:?}", self.state, next);
    if next.is_header() {
      self.header = Header::new();
      self.end_written = false;
    }
    self.state = next;
  }
}

impl<W: Write> Drop for FitsWriter<W> {
  fn drop(&mut self) {
    if self.writer.is_some() {
      if let Err(e) = self.flush_block() {
        warn!("Pending block lost while dropping the writer: {}", e);
      }
      if let Some(Err(e)) = self.writer.as_mut().map(Write::flush) {
        warn!("Error flushing the dropped writer: {}", e);
      }
    }
  }
}

fn closed_err() -> Error {
  new_custom("Writer already closed")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    common::{RECORD_LEN, keywords::bitpix::BitPix},
    hdu::header::mandatory::PrimaryMandatoryKeywords,
  };
  use std::{cell::Cell, rc::Rc};

  /// Keeps the size of each write.
  #[derive(Default)]
  struct Recorder {
    data: Vec<u8>,
    writes: Vec<usize>,
  }

  impl Write for Recorder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.data.extend_from_slice(buf);
      self.writes.push(buf.len());
      Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  /// Fails every write, counting the calls.
  struct Failing {
    calls: Rc<Cell<usize>>,
  }

  impl Write for Failing {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
      self.calls.set(self.calls.get() + 1);
      Err(std::io::Error::other("disk full"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  fn write_minimal_header<W: Write>(writer: &mut FitsWriter<W>, axes: Vec<u64>) {
    let header = PrimaryMandatoryKeywords::new(BitPix::U8, axes).to_header().unwrap();
    for record in &header {
      writer.write_header_record(record.clone()).unwrap();
    }
  }

  #[test]
  fn test_header_blocks() {
    let mut writer = FitsWriter::new(Recorder::default());
    write_minimal_header(&mut writer, vec![]);
    assert_eq!(writer.pending_bytes(), 3 * RECORD_LEN);
    assert_eq!(writer.bytes_written(), 0);
    writer.end_header().unwrap();
    assert_eq!(writer.state(), WriterState::PrimaryData);
    assert_eq!(writer.header().len(), 4);
    assert!(writer.header().is_terminated());
    let recorder = writer.finish().unwrap();
    assert_eq!(recorder.writes, vec![BLOCK_LEN]);
    assert!(recorder.data[3 * RECORD_LEN..].starts_with(b"END     "));
    assert!(recorder.data[4 * RECORD_LEN..].iter().all(|b| *b == b' '));
  }

  #[test]
  fn test_long_header() {
    let mut writer = FitsWriter::new(Recorder::default());
    write_minimal_header(&mut writer, vec![4]);
    for i in 0..40 {
      writer
        .write_header_record(HeaderRecord::history(&format!("line {}", i)).unwrap())
        .unwrap();
    }
    assert_eq!(writer.bytes_written(), BLOCK_LEN as u64);
    writer.end_header().unwrap();
    writer.write_data_array(&[1, 2, 3, 4]).unwrap();
    assert_eq!(writer.state(), WriterState::SecondaryHeader);
    assert!(writer.header().is_empty());
    let recorder = writer.finish().unwrap();
    assert_eq!(recorder.data.len(), 3 * BLOCK_LEN);
    assert_eq!(&recorder.data[2 * BLOCK_LEN..2 * BLOCK_LEN + 4], &[1, 2, 3, 4]);
    assert!(recorder.data[2 * BLOCK_LEN + 4..].iter().all(|b| *b == 0));
  }

  #[test]
  fn test_data_bytes() {
    let mut writer = FitsWriter::new(Vec::new());
    write_minimal_header(&mut writer, vec![3]);
    writer.end_header().unwrap();
    for b in [7_u8, 8, 9] {
      writer.write_data_byte(b).unwrap();
    }
    // A data array can not be written over pending bytes
    let err = writer.write_data_array(&[1]).unwrap_err();
    assert!(err.is_phase_violation());
    writer.end_data().unwrap();
    assert_eq!(writer.state(), WriterState::SecondaryHeader);
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes.len(), 2 * BLOCK_LEN);
    assert_eq!(&bytes[BLOCK_LEN..BLOCK_LEN + 4], &[7, 8, 9, 0]);
  }

  #[test]
  fn test_phase_violations() {
    let mut writer = FitsWriter::new(Vec::new());
    assert!(writer.write_data_array(&[0]).unwrap_err().is_phase_violation());
    assert!(writer.write_data_byte(0).unwrap_err().is_phase_violation());
    assert!(writer.end_data().unwrap_err().is_phase_violation());

    writer.write_header_record(HeaderRecord::end()).unwrap();
    let err = writer
      .write_header_record(HeaderRecord::blank())
      .unwrap_err();
    assert!(err.is_phase_violation());
    writer.end_header().unwrap();

    assert!(writer.end_header().unwrap_err().is_phase_violation());
    let err = writer
      .write_header_record(HeaderRecord::comment("late").unwrap())
      .unwrap_err();
    assert!(matches!(
      *err,
      crate::error::FitsError::PhaseViolation {
        operation: "write_header_record",
        state: WriterState::PrimaryData,
        ..
      }
    ));
    writer.close().unwrap();
  }

  #[test]
  fn test_secondary_states() {
    let mut writer = FitsWriter::new(Vec::new());
    writer.end_header().unwrap();
    writer.write_data_array(&[]).unwrap();
    assert_eq!(writer.state(), WriterState::SecondaryHeader);
    writer.write_record(&Record::from_text("XTENSION= 'IMAGE   '").unwrap()).unwrap();
    writer.end_header().unwrap();
    assert_eq!(writer.state(), WriterState::SecondaryData);
    writer.write_data_array(&[]).unwrap();
    assert_eq!(writer.state(), WriterState::SecondaryHeader);
    assert_eq!(writer.finish().unwrap().len(), 2 * BLOCK_LEN);
  }

  #[test]
  fn test_close_without_pending() {
    FitsWriter::new(Vec::new()).close().unwrap();
    let writer = FitsWriter::new(Vec::new());
    assert!(writer.finish().unwrap().is_empty());
  }

  #[test]
  fn test_header_data_unit_appended_after_end() {
    let mut hdu = HeaderDataUnit::new_image(BitPix::U8, vec![2], vec![5, 6]).unwrap();
    let mut header: Header = hdu.header().iter().cloned().collect();
    header.append(HeaderRecord::end());
    header.append_history("after end").unwrap();
    let mandatory = hdu.mandatory().clone();
    hdu = HeaderDataUnit::new(header, mandatory, hdu.data_type(), vec![5, 6]).unwrap();
    assert_eq!(hdu.header().iter().last().map(HeaderRecord::keyword), Some("HISTORY"));

    let mut writer = FitsWriter::new(Vec::new());
    writer.write_header_data_unit(&hdu).unwrap();
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes.len(), 2 * BLOCK_LEN);
    assert!(bytes[4 * RECORD_LEN..].starts_with(b"HISTORY after end"));
    assert!(bytes[5 * RECORD_LEN..].starts_with(b"END     "));
    assert!(bytes[6 * RECORD_LEN..BLOCK_LEN].iter().all(|b| *b == b' '));
  }

  #[test]
  fn test_failed_block_not_resent() {
    let calls = Rc::new(Cell::new(0));
    let mut writer = FitsWriter::new(Failing {
      calls: Rc::clone(&calls),
    });
    writer
      .write_header_record(HeaderRecord::logical("SIMPLE", true, None).unwrap())
      .unwrap();
    assert!(writer.finish().is_err());
    // The writer has been dropped: the failed block is not written again
    assert_eq!(calls.get(), 1);
  }

  #[test]
  fn test_drop_flushes() {
    let mut out = Vec::new();
    {
      let mut writer = FitsWriter::new(&mut out);
      writer
        .write_header_record(HeaderRecord::logical("SIMPLE", true, None).unwrap())
        .unwrap();
    }
    assert_eq!(out.len(), BLOCK_LEN);
    assert!(out.starts_with(b"SIMPLE  =                    T"));
  }
}
