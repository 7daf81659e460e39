//! The matrix codec, for fixed-point transform matrices.
//!
//! A matrix record is exactly 64 bytes: 16 unsigned 32-bit fixed-point
//! fields, arranged as 4 rows of 4. The emitted body is one bracketed row
//! per line, with every field as an 8-digit hexadecimal literal, so the
//! value reassembles bit-exactly no matter how the fixed-point halves were
//! split.

use crate::gen::BadLength;
use crate::rom::Endian;

/// The exact byte length of a matrix record.
pub const LEN: usize = 0x40;

/// Decodes one matrix record into declaration body lines.
///
/// The first and last lines are the doubled braces the `Mtx` union
/// initializer needs; the codec's caller glues them onto the declaration
/// head and terminator.
pub fn body(data: &[u8], endian: Endian) -> Result<Vec<String>, BadLength> {
  if data.len() != LEN {
    return Err(BadLength {
      expected: "a length of 0x40",
      got: data.len(),
    });
  }

  let mut lines = Vec::with_capacity(6);
  lines.push("{{".to_string());
  for row in data.chunks(16) {
    let m: Vec<_> = row
      .chunks(4)
      .map(|field| format!("0x{:08X}", endian.read_u32(field)))
      .collect();
    lines.push(format!("    {{ {}, {}, {}, {} }},", m[0], m[1], m[2], m[3]));
  }
  lines.push("}}".to_string());
  Ok(lines)
}
