//! The display-list decompiler, for dismantling graphics command streams.
//!
//! A display list is a binary stream of fixed-width (8-byte) commands, each
//! beginning with a one-byte opcode selector. This module decodes such a
//! stream back into the symbolic macro calls a programmer would have written:
//! each command dispatches through a per-dialect descriptor table
//! ([`tables`]), which extracts the command's operand fields and formats one
//! macro call per command. Operands that carry addresses are resolved through
//! the shared symbol table rather than emitted as raw numbers.
//!
//! Decoding halts at the first end-of-list command, or when the stream is
//! exhausted. Commands the active table does not understand are emitted as
//! raw word-pair literals, which keeps the output compilable and preserves
//! byte-for-byte round-trip fidelity.
//!
//! [`tables`]: tables/index.html

use std::fmt;

use crate::rom::Endian;
use crate::sym::SymbolTable;
use crate::sym::SymType;

pub mod tables;

/// Bytes per display-list command.
pub const CMD_SIZE: usize = 8;

/// Bytes per vertex record, used to recover element indices from vertex
/// pointers.
pub const VTX_SIZE: u32 = 16;

/// A microcode dialect, selecting which opcode encoding to decode with.
///
/// This is a closed set; configuration naming anything else is a fatal error.
/// The `b` dialects are beta revisions of their parents and share their
/// descriptor tables, with the divergent entries left as unhandled
/// placeholders.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Ucode {
  /// The original fast3d microcode.
  F3d,
  /// The beta revision of fast3d.
  F3db,
  /// The extended microcode.
  F3dex,
  /// The beta revision of f3dex.
  F3dexb,
  /// The second-generation extended microcode.
  F3dex2,
}

impl Ucode {
  /// Parses a dialect from its configuration name.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "f3d" => Some(Self::F3d),
      "f3db" => Some(Self::F3db),
      "f3dex" => Some(Self::F3dex),
      "f3dexb" => Some(Self::F3dexb),
      "f3dex2" => Some(Self::F3dex2),
      _ => None,
    }
  }

  /// Returns the configuration name for this dialect.
  pub fn name(self) -> &'static str {
    match self {
      Self::F3d => "f3d",
      Self::F3db => "f3db",
      Self::F3dex => "f3dex",
      Self::F3dexb => "f3dexb",
      Self::F3dex2 => "f3dex2",
    }
  }

  /// Returns the opcode descriptor table for this dialect.
  pub fn table(self) -> &'static tables::Table {
    match self {
      Self::F3d | Self::F3db => &tables::F3D,
      Self::F3dex | Self::F3dexb => &tables::F3DEX,
      Self::F3dex2 => &tables::F3DEX2,
    }
  }
}

impl fmt::Display for Ucode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// The signal a handler reports after decoding one command.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Step {
  /// Keep decoding the next command.
  Continue,
  /// The command was a terminal end-of-list marker; stop.
  Stop,
}

/// A structural decode failure.
///
/// Unrecognized opcodes are not errors (see the module docs); this only
/// covers streams that cannot be framed into commands at all.
#[derive(Debug)]
pub enum Error {
  /// The stream length is not a whole number of commands.
  Truncated {
    /// The offending stream length, in bytes.
    len: usize,
  },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Truncated { len } => write!(
        f,
        "display list length ({}) is not a multiple of {}",
        len, CMD_SIZE
      ),
    }
  }
}

/// Decoder state threaded through every opcode handler.
///
/// Handlers use this to resolve address operands into symbols and to append
/// their formatted macro calls to the output.
pub struct Decoder<'a> {
  syms: &'a mut SymbolTable,
  in_segment: bool,
  lines: Vec<String>,
}

impl<'a> Decoder<'a> {
  /// Appends one macro call to the output, with the fixed indentation and
  /// trailing comma every display-list line carries.
  pub fn emit(&mut self, macro_call: &str) {
    self.lines.push(format!("    {},", macro_call));
  }

  /// Resolves an address operand as generic data, creating a reference
  /// symbol on first sight.
  pub fn resolve_data(&mut self, addr: u32) -> String {
    let in_segment = self.in_segment;
    self
      .syms
      .create_or_get(addr, SymType::Data, None, false, in_segment)
      .name
      .clone()
  }

  /// Resolves a sub-display-list reference.
  ///
  /// A symbol already declared with the strong `Gfx` type is preferred; only
  /// when none exists is a generic data reference created.
  pub fn resolve_dl(&mut self, addr: u32) -> String {
    if let Some(sym) = self.syms.find_typed(addr, SymType::Gfx) {
      return sym.name.clone();
    }
    self.resolve_data(addr)
  }

  /// Resolves a vertex-array reference into an `&name[index]` form.
  ///
  /// The lookup prefers a previously declared `Vtx` symbol at the exact
  /// address, then searches known `Vtx` ranges for one containing the
  /// address, and only then creates a fresh reference sized from the load
  /// count. The element index recovers references into the middle of an
  /// array.
  pub fn resolve_vtx(&mut self, addr: u32, count: u32) -> String {
    let base = match self.syms.find_typed(addr, SymType::Vtx) {
      Some(sym) => (sym.addr, sym.name.clone()),
      None => match self.syms.find_containing(addr, SymType::Vtx) {
        Some(sym) => (sym.addr, sym.name.clone()),
        None => {
          let in_segment = self.in_segment;
          let sym = self.syms.create_or_get(
            addr,
            SymType::Vtx,
            Some(count * VTX_SIZE),
            false,
            in_segment,
          );
          (sym.addr, sym.name.clone())
        }
      },
    };

    let index = (addr - base.0) / VTX_SIZE;
    format!("&{}[{}]", base.1, index)
  }

  /// Resolves a record reference that is emitted with an address-of
  /// qualifier, e.g. a matrix or viewport pointer.
  pub fn resolve_ref(&mut self, addr: u32) -> String {
    format!("&{}", self.resolve_data(addr))
  }
}

/// Decompiles one display-list byte range into macro-call source lines.
///
/// Address operands deposit symbols into `syms` as a side effect;
/// `in_segment` is the visibility flag those symbols are created with. The
/// returned lines form the body of a `Gfx[]` declaration.
pub fn decompile(
  data: &[u8],
  endian: Endian,
  ucode: Ucode,
  in_segment: bool,
  syms: &mut SymbolTable,
) -> Result<Vec<String>, Error> {
  if data.len() % CMD_SIZE != 0 {
    return Err(Error::Truncated { len: data.len() });
  }

  let table = ucode.table();
  let mut decoder = Decoder {
    syms,
    in_segment,
    // One line per command is the exact upper bound; decoding only ever
    // stops early.
    lines: Vec::with_capacity(data.len() / CMD_SIZE),
  };

  for cmd in data.chunks(CMD_SIZE) {
    let w0 = endian.read_u32(&cmd[0..4]);
    let w1 = endian.read_u32(&cmd[4..8]);
    let op = table.get((w0 >> 24) as u8);
    match (op.handler)(&mut decoder, op, w0, w1) {
      Step::Continue => {}
      Step::Stop => break,
    }
  }

  Ok(decoder.lines)
}

#[cfg(test)]
mod test {
  use super::*;

  fn run(words: &[(u32, u32)], ucode: Ucode, syms: &mut SymbolTable) -> Vec<String> {
    let mut data = Vec::new();
    for &(w0, w1) in words {
      data.extend_from_slice(&w0.to_be_bytes());
      data.extend_from_slice(&w1.to_be_bytes());
    }
    decompile(&data, Endian::Big, ucode, true, syms).unwrap()
  }

  #[test]
  fn lone_end_marker_emits_only_itself() {
    let mut syms = SymbolTable::new();
    let lines = run(&[(0xDF00_0000, 0)], Ucode::F3dex2, &mut syms);
    assert_eq!(lines, vec!["    gsSPEndDisplayList(),".to_string()]);

    let lines = run(&[(0xB800_0000, 0)], Ucode::F3dex, &mut syms);
    assert_eq!(lines, vec!["    gsSPEndDisplayList(),".to_string()]);
  }

  #[test]
  fn decoding_halts_at_end_marker() {
    let mut syms = SymbolTable::new();
    // The pipe sync after the end marker must not be decoded.
    let lines = run(
      &[(0xE700_0000, 0), (0xDF00_0000, 0), (0xE700_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(
      lines,
      vec![
        "    gsDPPipeSync(),".to_string(),
        "    gsSPEndDisplayList(),".to_string(),
      ]
    );
  }

  #[test]
  fn truncated_stream_is_fatal() {
    let mut syms = SymbolTable::new();
    let err = decompile(&[0xDF, 0, 0], Endian::Big, Ucode::F3dex2, true, &mut syms);
    assert!(err.is_err());
  }

  #[test]
  fn little_endian_words_decode() {
    let mut syms = SymbolTable::new();
    let mut data = Vec::new();
    data.extend_from_slice(&0xDF00_0000u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    let lines =
      decompile(&data, Endian::Little, Ucode::F3dex2, true, &mut syms).unwrap();
    assert_eq!(lines, vec!["    gsSPEndDisplayList(),".to_string()]);
  }

  #[test]
  fn dl_reference_prefers_typed_symbol() {
    let mut syms = SymbolTable::new();
    syms.create_or_get(0x0600_1000, SymType::Gfx, None, true, true);
    let lines = run(
      &[(0xDE00_0000, 0x0600_1000), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    gsSPDisplayList(gfx_06001000),");
  }

  #[test]
  fn dl_reference_falls_back_to_data() {
    let mut syms = SymbolTable::new();
    let lines = run(
      &[(0xDE00_0000, 0x0600_2000), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    gsSPDisplayList(D_06002000),");
    // The fallback deposited a reference symbol.
    assert!(syms.find_typed(0x0600_2000, SymType::Data).is_some());
  }

  #[test]
  fn branch_list_uses_branch_macro() {
    let mut syms = SymbolTable::new();
    let lines = run(
      &[(0xDE01_0000, 0x0600_2000), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    gsSPBranchList(D_06002000),");
  }

  #[test]
  fn vertex_reference_recovers_index() {
    let mut syms = SymbolTable::new();
    syms.create_or_get(0x0600_0000, SymType::Vtx, Some(0x40), true, true);

    // f3dex2 gsSPVertex(v, n, v0): n in bits 12..20, (v0 + n) * 2 in the low
    // byte. Load 2 vertices starting 0x20 into the known array.
    let w0 = 0x0100_0000 | (2 << 12) | ((0 + 2) << 1);
    let lines = run(&[(w0, 0x0600_0020), (0xDF00_0000, 0)], Ucode::F3dex2, &mut syms);
    assert_eq!(lines[0], "    gsSPVertex(&vtx_06000000[2], 2, 0),");
  }

  #[test]
  fn vertex_reference_creates_sized_symbol() {
    let mut syms = SymbolTable::new();
    let w0 = 0x0100_0000 | (4 << 12) | ((0 + 4) << 1);
    let lines = run(&[(w0, 0x0600_0100), (0xDF00_0000, 0)], Ucode::F3dex2, &mut syms);
    assert_eq!(lines[0], "    gsSPVertex(&vtx_06000100[0], 4, 0),");
    let sym = syms.find_typed(0x0600_0100, SymType::Vtx).unwrap();
    assert_eq!(sym.size, Some(4 * VTX_SIZE));
  }

  #[test]
  fn f3dex_vertex_encoding() {
    let mut syms = SymbolTable::new();
    // f3dex gsSPVertex: v0 * 2 in bits 16..24, n in bits 10..16.
    let w0 = 0x0400_0000 | ((3 * 2) << 16) | (4 << 10) | (4 * 16 - 1);
    let lines = run(&[(w0, 0x0600_0000), (0xB800_0000, 0)], Ucode::F3dex, &mut syms);
    assert_eq!(lines[0], "    gsSPVertex(&vtx_06000000[0], 4, 3),");
  }

  #[test]
  fn f3d_vertex_encoding() {
    let mut syms = SymbolTable::new();
    // f3d gsSPVertex: (n - 1) in bits 20..24, v0 in bits 16..20.
    let w0 = 0x0400_0000 | ((4 - 1) << 20) | (2 << 16) | (4 * 16);
    let lines = run(&[(w0, 0x0600_0000), (0xB800_0000, 0)], Ucode::F3d, &mut syms);
    assert_eq!(lines[0], "    gsSPVertex(&vtx_06000000[0], 4, 2),");
  }

  #[test]
  fn unknown_opcode_emits_raw_words() {
    let mut syms = SymbolTable::new();
    let lines = run(
      &[(0xFC12_3456, 0xDEAD_BEEF), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    {{0xFC123456, 0xDEADBEEF}},");
  }

  #[test]
  fn triangles_decode() {
    let mut syms = SymbolTable::new();
    // gsSP1Triangle(2, 4, 6): vertex indices are stored doubled.
    let lines = run(
      &[(0x0504_080C, 0), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    gsSP1Triangle(2, 4, 6, 0),");

    let lines = run(
      &[(0x0600_0204, 0x0006_080A), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    gsSP2Triangles(0, 1, 2, 0, 3, 4, 5, 0),");
  }

  #[test]
  fn texture_image_decodes_format_and_symbol() {
    let mut syms = SymbolTable::new();
    // RGBA (0) 16-bit (2), width 32.
    let w0 = 0xFD00_0000 | (0 << 21) | (2 << 19) | (32 - 1);
    let lines = run(&[(w0, 0x0800_0000), (0xDF00_0000, 0)], Ucode::F3dex2, &mut syms);
    assert_eq!(
      lines[0],
      "    gsDPSetTextureImage(G_IM_FMT_RGBA, G_IM_SIZ_16b, 32, D_08000000),"
    );
  }

  #[test]
  fn matrix_load_takes_reference() {
    let mut syms = SymbolTable::new();
    // f3dex2 G_MTX: parameter bits live in the low byte, with G_MTX_PUSH
    // stored inverted.
    let lines = run(
      &[(0xDA00_0000 | 0x01, 0x0700_0000), (0xDF00_0000, 0)],
      Ucode::F3dex2,
      &mut syms,
    );
    assert_eq!(lines[0], "    gsSPMatrix(&D_07000000, 0x00),");
  }

  #[test]
  fn unknown_ucode_name_is_rejected() {
    assert!(Ucode::from_name("f3dzex").is_none());
    assert_eq!(Ucode::from_name("f3dex2"), Some(Ucode::F3dex2));
  }
}
