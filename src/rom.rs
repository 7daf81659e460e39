//! Types and functions for manipulating the source ROM image.
//!
//! Unlike a live console, NSPLIT works on a single flat image that has
//! already been loaded into memory. Segments address into it by plain file
//! offset; the mapping between file offsets and virtual load addresses is
//! carried by each segment's metadata, not by the image itself.

use std::fs;
use std::io;
use std::path::Path;

/// Byte order used to interpret multi-byte fields in the image.
///
/// Cartridge dumps circulate in both orders; every fixed-width field read
/// by a codec goes through one of these accessors so the choice is made in
/// exactly one place.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Endian {
  /// Big-endian, the console's native order.
  Big,
  /// Little-endian, as produced by some dumper hardware.
  Little,
}

impl Endian {
  /// Reads a `u32` from the first four bytes of `bytes`.
  ///
  /// # Panics
  /// Panics if `bytes` is shorter than four bytes; callers are expected to
  /// have length-checked the enclosing record already.
  #[inline]
  pub fn read_u32(self, bytes: &[u8]) -> u32 {
    let arr = [bytes[0], bytes[1], bytes[2], bytes[3]];
    match self {
      Self::Big => u32::from_be_bytes(arr),
      Self::Little => u32::from_le_bytes(arr),
    }
  }

  /// Reads a `u16` from the first two bytes of `bytes`.
  #[inline]
  pub fn read_u16(self, bytes: &[u8]) -> u16 {
    let arr = [bytes[0], bytes[1]];
    match self {
      Self::Big => u16::from_be_bytes(arr),
      Self::Little => u16::from_le_bytes(arr),
    }
  }

  /// Reads an `i16` from the first two bytes of `bytes`.
  #[inline]
  pub fn read_i16(self, bytes: &[u8]) -> i16 {
    self.read_u16(bytes) as i16
  }
}

/// The full in-memory ROM image.
///
/// All segment scans slice out of this one buffer; no decoder performs I/O
/// mid-decode.
pub struct Rom {
  bytes: Box<[u8]>,
}

impl Rom {
  /// Wraps an already-loaded image.
  pub fn from_bytes(bytes: Vec<u8>) -> Self {
    Self {
      bytes: bytes.into_boxed_slice(),
    }
  }

  /// Reads an image from the file at `path`.
  pub fn read_file(path: &Path) -> io::Result<Self> {
    Ok(Self::from_bytes(fs::read(path)?))
  }

  /// Returns the number of bytes in this image.
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  /// Returns true if the image is empty.
  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// Returns the byte range `[start, end)`, if it lies within the image.
  pub fn slice(&self, start: usize, end: usize) -> Option<&[u8]> {
    if start > end || end > self.bytes.len() {
      return None;
    }
    Some(&self.bytes[start..end])
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn endian_reads() {
    let bytes = [0x12, 0x34, 0x56, 0x78];
    assert_eq!(Endian::Big.read_u32(&bytes), 0x12345678);
    assert_eq!(Endian::Little.read_u32(&bytes), 0x78563412);
    assert_eq!(Endian::Big.read_u16(&bytes), 0x1234);
    assert_eq!(Endian::Little.read_u16(&bytes), 0x3412);
    assert_eq!(Endian::Big.read_i16(&[0xff, 0xf6]), -10);
  }

  #[test]
  fn rom_slicing() {
    let rom = Rom::from_bytes(vec![0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(rom.len(), 8);
    assert_eq!(rom.slice(2, 4), Some(&[2u8, 3][..]));
    assert_eq!(rom.slice(0, 8), Some(&[0u8, 1, 2, 3, 4, 5, 6, 7][..]));
    assert_eq!(rom.slice(4, 9), None);
    assert_eq!(rom.slice(5, 4), None);
  }
}
