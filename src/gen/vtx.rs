//! The vertex-array codec.
//!
//! A vertex is a 16-byte record: three signed 16-bit position components, an
//! unsigned 16-bit flag, two signed 16-bit texture coordinates, and four
//! unsigned color/alpha bytes. A segment holds `len / 16` of them; the
//! emitted body is one brace-grouped literal per element.

use crate::rom::Endian;

/// Bytes per vertex record.
pub const SIZE: usize = 16;

/// Decodes a vertex array into declaration body lines.
///
/// A range that is not a whole number of records is suspicious but not
/// fatal: the remainder is dropped with a warning and the whole records are
/// still emitted. A non-zero flag field is likewise warned about and
/// emitted as-is, since it round-trips.
pub fn body(data: &[u8], endian: Endian, name: &str) -> Vec<String> {
  if data.len() % SIZE != 0 {
    log::warn!(
      "vtx segment {} length (0x{:X}) is not a multiple of 16; \
       dropping the remainder",
      name,
      data.len()
    );
  }

  let mut lines = Vec::with_capacity(data.len() / SIZE);
  for record in data.chunks_exact(SIZE) {
    let x = endian.read_i16(&record[0..2]);
    let y = endian.read_i16(&record[2..4]);
    let z = endian.read_i16(&record[4..6]);
    let flag = endian.read_u16(&record[6..8]);
    let t = endian.read_i16(&record[8..10]);
    let c = endian.read_i16(&record[10..12]);
    let (r, g, b, a) = (record[12], record[13], record[14], record[15]);

    if flag != 0 {
      log::warn!("non-zero flag found in vertex data {}!", name);
    }

    lines.push(format!(
      "    {{{{{{ {}, {}, {} }}, {}, {{ {}, {} }}, {{ {}, {}, {}, {} }}}}}},",
      x, y, z, flag, t, c, r, g, b, a
    ));
  }
  lines
}

/// Returns the element count a range of `len` bytes decodes to.
pub fn count(len: usize) -> usize {
  len / SIZE
}
