//! Segments and the scan/split/write lifecycle driver.
//!
//! A segment names a contiguous byte range of the source image and the
//! decoder that should turn it into source text. Segments move through a
//! fixed lifecycle:
//!
//! ```text
//! Unscanned -> Scanned -> Split -> Written
//! ```
//!
//! `scan` copies the raw byte range out of the image, `split` runs the
//! kind-specific codec over it (depositing symbols into the shared table as
//! a side effect), and `write` persists the generated text. The driver runs
//! each phase as a full pass over every segment before starting the next,
//! because symbol creation order affects generated names and later segments'
//! typed lookups may depend on symbols an earlier segment defined.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::error;
use crate::gen;
use crate::gen::Decl;
use crate::gen::Shape;
use crate::gfx;
use crate::meta::Opts;
use crate::rom::Rom;
use crate::sym::SymbolTable;
use crate::sym::SymType;

/// The closed set of segment kinds this splitter can extract.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SegKind {
  /// An opaque binary blob, extracted verbatim.
  Bin,
  /// A transform matrix record.
  Mtx,
  /// A lighting record.
  Light,
  /// A vertex array.
  Vtx,
  /// A graphics display list.
  Gfx,
}

impl SegKind {
  /// Parses a kind from its configuration name.
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "bin" => Some(Self::Bin),
      "mtx" => Some(Self::Mtx),
      "light" => Some(Self::Light),
      "vtx" => Some(Self::Vtx),
      "gfx" => Some(Self::Gfx),
      _ => None,
    }
  }

  /// Returns the configuration name for this kind.
  pub fn name(self) -> &'static str {
    match self {
      Self::Bin => "bin",
      Self::Mtx => "mtx",
      Self::Light => "light",
      Self::Vtx => "vtx",
      Self::Gfx => "gfx",
    }
  }

  /// Returns the file suffix appended to a segment's name on output.
  pub fn out_suffix(self) -> &'static str {
    match self {
      Self::Bin => ".bin",
      Self::Mtx => ".mtx.inc.c",
      Self::Light => ".light.inc.c",
      Self::Vtx => ".vtx.inc.c",
      Self::Gfx => ".gfx.inc.c",
    }
  }

  /// Estimates a segment's byte length from a configured element count, for
  /// configurations that do not pin down an end offset directly.
  pub fn estimate_size(self, length: Option<usize>) -> Option<usize> {
    match self {
      Self::Mtx => Some(gen::mtx::LEN),
      Self::Light => Some(0x18),
      Self::Vtx | Self::Gfx => length.map(|n| n * 0x10),
      Self::Bin => None,
    }
  }
}

impl fmt::Display for SegKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// The lifecycle phase a segment last completed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Phase {
  /// Constructed from configuration; holds no data yet.
  Unscanned,
  /// Raw bytes copied out of the image.
  Scanned,
  /// Text generated (and symbols deposited).
  Split,
  /// Output persisted; terminal.
  Written,
}

/// A named, typed, contiguous byte range of the source image scheduled for
/// extraction.
pub struct Segment {
  /// The segment's kind, selecting its decoder.
  pub kind: SegKind,
  /// The segment's name, used for output paths and diagnostics.
  pub name: String,
  /// The start offset of the range in the image.
  pub rom_start: usize,
  /// The end offset, exclusive. An unresolved end is a fatal configuration
  /// error at scan time.
  pub rom_end: Option<usize>,
  /// The address this range is mapped to at run time. Optional for data
  /// that is never loaded (plain binary blobs).
  pub vram: Option<u32>,
  /// The directory this segment's output lands in, relative to the asset
  /// root.
  pub dir: PathBuf,
  /// Whether this segment should be materialized at all.
  pub extract: bool,
  /// Suppresses the declaration wrapper, emitting only raw body lines for
  /// splicing into an enclosing declaration.
  pub data_only: bool,
  /// Whether symbols created for addresses referenced by this segment are
  /// treated as falling inside it.
  pub in_segment: bool,

  phase: Phase,
  data: Vec<u8>,
  text: Option<String>,
}

impl Segment {
  /// Creates a segment in its initial lifecycle state.
  ///
  /// The defaults mirror configuration defaults: extracted, with a full
  /// declaration wrapper, references in-segment.
  pub fn new(kind: SegKind, name: &str, rom_start: usize) -> Self {
    Self {
      kind,
      name: name.to_string(),
      rom_start,
      rom_end: None,
      vram: None,
      dir: PathBuf::new(),
      extract: true,
      data_only: false,
      in_segment: true,
      phase: Phase::Unscanned,
      data: Vec::new(),
      text: None,
    }
  }

  /// Returns the phase this segment last completed.
  pub fn phase(&self) -> Phase {
    self.phase
  }

  /// Returns the raw bytes copied by `scan`, if it has run.
  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// Returns the text produced by `split`, if any.
  pub fn text(&self) -> Option<&str> {
    self.text.as_deref()
  }

  /// Returns the path this segment's output is written to, under `root`.
  pub fn out_path(&self, root: &Path) -> PathBuf {
    root
      .join(&self.dir)
      .join(format!("{}{}", self.name, self.kind.out_suffix()))
  }

  /// Whether the scan phase should run for this segment.
  pub fn should_scan(&self, opts: &Opts) -> bool {
    opts.is_mode_active(self.kind)
  }

  /// Whether the split phase should run for this segment.
  pub fn should_split(&self, opts: &Opts) -> bool {
    self.extract && opts.is_mode_active(self.kind)
  }

  /// Copies this segment's byte range out of the image.
  pub fn scan(&mut self, rom: &Rom) -> Result<(), Error> {
    let end = match self.rom_end {
      Some(end) => end,
      None => {
        return Err(Error::UnresolvedEnd {
          name: self.name.clone(),
        })
      }
    };

    let bytes = match rom.slice(self.rom_start, end) {
      Some(bytes) => bytes,
      None => {
        return Err(Error::OutOfBounds {
          name: self.name.clone(),
          start: self.rom_start,
          end,
          rom_len: rom.len(),
        })
      }
    };

    self.data = bytes.to_vec();
    self.phase = Phase::Scanned;
    Ok(())
  }

  /// Decodes this segment's bytes into source text.
  ///
  /// New symbols are deposited into `syms` as a side effect: one defining
  /// symbol for the segment itself, plus whatever references the
  /// display-list decompiler encounters.
  pub fn split(&mut self, opts: &Opts, syms: &mut SymbolTable) -> Result<(), Error> {
    if self.kind == SegKind::Bin {
      // Binary blobs have no text form; write() emits the raw bytes.
      self.phase = Phase::Split;
      return Ok(());
    }

    let vram = match self.vram {
      Some(vram) => vram,
      None => {
        return Err(Error::MissingVram {
          name: self.name.clone(),
        })
      }
    };

    let sym_ty = match self.kind {
      SegKind::Mtx => SymType::Mtx,
      SegKind::Vtx => SymType::Vtx,
      SegKind::Gfx => SymType::Gfx,
      _ => SymType::Data,
    };
    let sym_name = syms
      .create_or_get(vram, sym_ty, Some(self.data.len() as u32), true, true)
      .name
      .clone();

    let bad_len = |e: gen::BadLength| Error::LengthMismatch {
      name: self.name.clone(),
      expected: e.expected,
      got: e.got,
    };

    let (data_type, shape, body) = match self.kind {
      SegKind::Mtx => {
        let body = gen::mtx::body(&self.data, opts.endian).map_err(bad_len)?;
        ("Mtx", Shape::Scalar, body)
      }
      SegKind::Light => {
        let body = gen::light::body(&self.data).map_err(bad_len)?;
        ("Lights1", Shape::Scalar, body)
      }
      SegKind::Vtx => {
        let body = gen::vtx::body(&self.data, opts.endian, &self.name);
        let count = gen::vtx::count(self.data.len());
        ("Vtx", Shape::Array(Some(count)), body)
      }
      SegKind::Gfx => {
        let body = gfx::decompile(
          &self.data,
          opts.endian,
          opts.ucode,
          self.in_segment,
          syms,
        )
        .map_err(|e| match e {
          gfx::Error::Truncated { len } => Error::BadStream {
            name: self.name.clone(),
            len,
          },
        })?;
        ("Gfx", Shape::Array(None), body)
      }
      SegKind::Bin => unreachable!(),
    };

    let decl = Decl {
      data_type,
      name: &sym_name,
      shape,
      data_only: self.data_only,
    };
    self.text = Some(gen::assemble(&decl, &opts.preamble, body));
    self.phase = Phase::Split;
    Ok(())
  }

  /// Persists this segment's output under `root`.
  ///
  /// This is a no-op if the segment produced nothing to write, e.g. because
  /// it was gated off earlier. Parent directories are created as needed.
  pub fn write(&mut self, root: &Path) -> Result<(), Error> {
    let path = self.out_path(root);

    let bytes: &[u8] = match (self.kind, &self.text) {
      (SegKind::Bin, _) if self.phase == Phase::Split => &self.data,
      (_, Some(text)) => text.as_bytes(),
      _ => return Ok(()),
    };

    let result = (|| {
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::write(&path, bytes)
    })();
    if let Err(cause) = result {
      return Err(Error::Io {
        name: self.name.clone(),
        path,
        cause,
      });
    }
    log::debug!("wrote {} to {}", self.name, path.display());
    self.phase = Phase::Written;
    Ok(())
  }
}

/// Drives the full lifecycle over a collection of segments.
///
/// Each phase runs as a complete pass before the next begins; the first
/// fatal error aborts the run, leaving already-written segments untouched.
pub fn split_all(
  rom: &Rom,
  segments: &mut [Segment],
  opts: &Opts,
  syms: &mut SymbolTable,
) -> Result<(), Error> {
  for segment in segments.iter_mut() {
    if segment.should_scan(opts) {
      segment.scan(rom)?;
    }
  }
  for segment in segments.iter_mut() {
    if segment.should_split(opts) && segment.phase() == Phase::Scanned {
      segment.split(opts, syms)?;
    }
  }
  for segment in segments.iter_mut() {
    segment.write(&opts.asset_path)?;
  }
  Ok(())
}

/// An error produced while driving a segment through its lifecycle.
#[derive(Debug)]
pub enum Error {
  /// The segment's end offset was never resolved by configuration.
  UnresolvedEnd {
    /// The segment's name.
    name: String,
  },
  /// The segment's byte range does not fit inside the image.
  OutOfBounds {
    /// The segment's name.
    name: String,
    /// The configured start offset.
    start: usize,
    /// The configured end offset.
    end: usize,
    /// The actual image length.
    rom_len: usize,
  },
  /// A typed segment has no load address to define its symbol at.
  MissingVram {
    /// The segment's name.
    name: String,
  },
  /// A fixed-record codec was handed a range of the wrong size.
  LengthMismatch {
    /// The segment's name.
    name: String,
    /// A description of the length the codec required.
    expected: &'static str,
    /// The length it observed.
    got: usize,
  },
  /// A display-list stream could not be framed into commands.
  BadStream {
    /// The segment's name.
    name: String,
    /// The offending stream length.
    len: usize,
  },
  /// Writing the segment's output failed.
  Io {
    /// The segment's name.
    name: String,
    /// The path being written.
    path: PathBuf,
    /// The underlying failure.
    cause: io::Error,
  },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::UnresolvedEnd { name } => write!(
        f,
        "segment {} needs to know where it ends; \
         add a position marker after it",
        name
      ),
      Self::OutOfBounds {
        name,
        start,
        end,
        rom_len,
      } => write!(
        f,
        "segment {} range 0x{:X}..0x{:X} is outside the image (0x{:X} bytes)",
        name, start, end, rom_len
      ),
      Self::MissingVram { name } => {
        write!(f, "segment {} has no load address", name)
      }
      Self::LengthMismatch {
        name,
        expected,
        got,
      } => write!(
        f,
        "segment {} expected {}, got 0x{:X}",
        name, expected, got
      ),
      Self::BadStream { name, len } => write!(
        f,
        "segment {} display list length (0x{:X}) is not a multiple of 8",
        name, len
      ),
      Self::Io { path, cause, .. } => {
        write!(f, "could not write {}: {}", path.display(), cause)
      }
    }
  }
}

impl error::Error for Error {
  fn cause(&self) -> error::Cause<'_> {
    match self {
      Self::Io { path, .. } => error::Cause::File(path),
      Self::UnresolvedEnd { name }
      | Self::OutOfBounds { name, .. }
      | Self::MissingVram { name }
      | Self::LengthMismatch { name, .. }
      | Self::BadStream { name, .. } => error::Cause::Segment(name),
    }
  }

  fn action(&self) -> Option<error::Action> {
    match self {
      Self::UnresolvedEnd { .. } | Self::OutOfBounds { .. } => {
        Some(error::Action::Scanning)
      }
      Self::MissingVram { .. }
      | Self::LengthMismatch { .. }
      | Self::BadStream { .. } => Some(error::Action::Splitting),
      Self::Io { .. } => Some(error::Action::Writing),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::meta;
  use crate::rom::Endian;

  fn opts() -> Opts {
    meta::Opts {
      asset_path: PathBuf::from("assets"),
      preamble: "#include \"header.h\"".to_string(),
      ucode: gfx::Ucode::F3dex2,
      endian: Endian::Big,
      modes: vec!["all".to_string()],
    }
  }

  fn mtx_rom() -> Rom {
    let mut bytes = Vec::new();
    for i in 0..16u32 {
      bytes.extend_from_slice(&i.to_be_bytes());
    }
    Rom::from_bytes(bytes)
  }

  #[test]
  fn lifecycle_phases_advance() {
    let rom = mtx_rom();
    let mut seg = Segment::new(SegKind::Mtx, "ident", 0);
    seg.rom_end = Some(0x40);
    seg.vram = Some(0x80100000);

    assert_eq!(seg.phase(), Phase::Unscanned);
    seg.scan(&rom).unwrap();
    assert_eq!(seg.phase(), Phase::Scanned);

    let mut syms = SymbolTable::new();
    seg.split(&opts(), &mut syms).unwrap();
    assert_eq!(seg.phase(), Phase::Split);

    let text = seg.text().unwrap();
    assert!(text.starts_with("#include \"header.h\"\n\nMtx mtx_80100000 = {{\n"));
    assert!(text.ends_with("}};\n"));
    assert!(syms.find_typed(0x80100000, SymType::Mtx).unwrap().defined);
  }

  #[test]
  fn unresolved_end_is_fatal() {
    let rom = mtx_rom();
    let mut seg = Segment::new(SegKind::Mtx, "noend", 0);
    seg.vram = Some(0x80100000);
    assert!(matches!(seg.scan(&rom), Err(Error::UnresolvedEnd { .. })));
  }

  #[test]
  fn short_matrix_produces_no_text() {
    let rom = mtx_rom();
    let mut seg = Segment::new(SegKind::Mtx, "short", 0);
    seg.rom_end = Some(0x3f);
    seg.vram = Some(0x80100000);
    seg.scan(&rom).unwrap();

    let mut syms = SymbolTable::new();
    let err = seg.split(&opts(), &mut syms);
    assert!(matches!(err, Err(Error::LengthMismatch { .. })));
    assert!(seg.text().is_none());
  }

  #[test]
  fn gated_off_segment_is_skipped() {
    let rom = mtx_rom();
    let mut opts = opts();
    opts.modes = vec!["gfx".to_string()];

    let mut seg = Segment::new(SegKind::Mtx, "gated", 0);
    seg.rom_end = Some(0x40);
    seg.vram = Some(0x80100000);

    let mut syms = SymbolTable::new();
    let mut segments = vec![seg];
    split_all(&rom, &mut segments, &opts, &mut syms).unwrap();

    assert_eq!(segments[0].phase(), Phase::Unscanned);
    assert!(segments[0].text().is_none());
    assert!(syms.is_empty());
  }

  #[test]
  fn extract_false_scans_but_does_not_split() {
    let rom = mtx_rom();
    let mut seg = Segment::new(SegKind::Mtx, "noextract", 0);
    seg.rom_end = Some(0x40);
    seg.vram = Some(0x80100000);
    seg.extract = false;

    let mut syms = SymbolTable::new();
    let mut segments = vec![seg];
    split_all(&rom, &mut segments, &opts(), &mut syms).unwrap();

    assert_eq!(segments[0].phase(), Phase::Scanned);
    assert!(segments[0].text().is_none());
  }

  #[test]
  fn vtx_segment_declares_counted_array() {
    let mut bytes = Vec::new();
    for _ in 0..2 {
      for v in &[10i16, 20, 30, 0, 1, 2] {
        bytes.extend_from_slice(&v.to_be_bytes());
      }
      bytes.extend_from_slice(&[255, 0, 0, 255]);
    }
    let rom = Rom::from_bytes(bytes);

    let mut seg = Segment::new(SegKind::Vtx, "verts", 0);
    seg.rom_end = Some(0x20);
    seg.vram = Some(0x80200000);
    seg.scan(&rom).unwrap();

    let mut syms = SymbolTable::new();
    seg.split(&opts(), &mut syms).unwrap();

    let text = seg.text().unwrap();
    assert!(text.contains("Vtx vtx_80200000[2] = {\n"));
    assert!(
      text.contains("{{{ 10, 20, 30 }, 0, { 1, 2 }, { 255, 0, 0, 255 }}}")
    );
    let sym = syms.find_typed(0x80200000, SymType::Vtx).unwrap();
    assert_eq!(sym.size, Some(0x20));
  }

  #[test]
  fn gfx_segment_decompiles_and_links_symbols() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xDE00_0000u32.to_be_bytes());
    bytes.extend_from_slice(&0x0600_1000u32.to_be_bytes());
    bytes.extend_from_slice(&0xDF00_0000u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    let rom = Rom::from_bytes(bytes);

    let mut seg = Segment::new(SegKind::Gfx, "dlist", 0);
    seg.rom_end = Some(0x10);
    seg.vram = Some(0x0600_2000);
    seg.scan(&rom).unwrap();

    let mut syms = SymbolTable::new();
    seg.split(&opts(), &mut syms).unwrap();

    let text = seg.text().unwrap();
    assert!(text.contains("Gfx gfx_06002000[] = {\n"));
    assert!(text.contains("    gsSPDisplayList(D_06001000),\n"));
    assert!(text.contains("    gsSPEndDisplayList(),\n"));

    // Both the defining symbol and the reference landed in the table.
    assert!(syms.find_typed(0x0600_2000, SymType::Gfx).unwrap().defined);
    assert!(!syms.find_typed(0x0600_1000, SymType::Data).unwrap().defined);
  }

  #[test]
  fn data_only_gfx_emits_bare_body() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xDF00_0000u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    let rom = Rom::from_bytes(bytes);

    let mut seg = Segment::new(SegKind::Gfx, "spliced", 0);
    seg.rom_end = Some(8);
    seg.vram = Some(0x0600_0000);
    seg.data_only = true;
    seg.scan(&rom).unwrap();

    let mut syms = SymbolTable::new();
    seg.split(&opts(), &mut syms).unwrap();
    assert_eq!(seg.text(), Some("    gsSPEndDisplayList(),\n"));
  }

  #[test]
  fn out_paths_carry_kind_suffix() {
    let seg = Segment::new(SegKind::Gfx, "room", 0);
    assert_eq!(
      seg.out_path(Path::new("assets")),
      PathBuf::from("assets/room.gfx.inc.c")
    );

    let mut seg = Segment::new(SegKind::Bin, "blob", 0);
    seg.dir = PathBuf::from("raw");
    assert_eq!(
      seg.out_path(Path::new("assets")),
      PathBuf::from("assets/raw/blob.bin")
    );
  }

  #[test]
  fn estimate_sizes() {
    assert_eq!(SegKind::Mtx.estimate_size(None), Some(0x40));
    assert_eq!(SegKind::Light.estimate_size(None), Some(0x18));
    assert_eq!(SegKind::Vtx.estimate_size(Some(4)), Some(0x40));
    assert_eq!(SegKind::Bin.estimate_size(Some(4)), None);
  }
}
