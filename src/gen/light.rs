//! The lighting codec, for ambient-plus-diffuse light records.
//!
//! A light record holds an ambient color, a diffuse color, and a diffuse
//! direction at fixed offsets, padded out by the hardware's alignment
//! requirements; trailing padding of up to twelve bytes is tolerated. The
//! emitted body is the argument list of a `gdSPDefLights1` initializer.

use crate::gen::BadLength;

/// The smallest acceptable record length: the meaningful fields end here.
pub const MIN_LEN: usize = 0x14;
/// The largest acceptable record length, padding included.
pub const MAX_LEN: usize = 0x20;

/// Decodes one light record into declaration body lines.
///
/// The layout is: ambient RGB at offsets 0..3, diffuse RGB at 8..11, and
/// the direction vector at 16..19. Everything else is padding and ignored.
pub fn body(data: &[u8]) -> Result<Vec<String>, BadLength> {
  if data.len() < MIN_LEN || data.len() > MAX_LEN {
    return Err(BadLength {
      expected: "a length between 0x14 and 0x20",
      got: data.len(),
    });
  }

  let ambient = &data[0..3];
  let diffuse = &data[8..11];
  let dir = &data[16..19];

  Ok(vec![
    "gdSPDefLights1(".to_string(),
    format!(
      "    0x{:02x}, 0x{:02x}, 0x{:02x},",
      ambient[0], ambient[1], ambient[2]
    ),
    format!(
      "    0x{:02x}, 0x{:02x}, 0x{:02x}, 0x{:02x}, 0x{:02x}, 0x{:02x}",
      diffuse[0], diffuse[1], diffuse[2], dir[0], dir[1], dir[2]
    ),
    ")".to_string(),
  ])
}
