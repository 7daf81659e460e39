//! Split metadata, which describes how to dismantle a ROM into source files.
//!
//! Metadata is loaded from a JSON5 file: a global options block plus one
//! entry per segment. The raw serde structs here are validated into the
//! typed forms the rest of the crate consumes ([`Opts`] and
//! [`seg::Segment`]), so that configuration mistakes surface before any
//! decoding starts.
//!
//! [`Opts`]: struct.Opts.html
//! [`seg::Segment`]: ../seg/struct.Segment.html

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error;
use crate::gfx::Ucode;
use crate::rom::Endian;
use crate::seg::SegKind;
use crate::seg::Segment;

/// A whole metadata file.
#[derive(Deserialize, Serialize)]
pub struct Metadata {
  /// Global options.
  #[serde(default)]
  pub options: Options,
  /// The segments to extract, in image order.
  pub segments: Vec<SegmentMeta>,
}

/// The raw global options block, as it appears on disk.
#[derive(Deserialize, Serialize)]
pub struct Options {
  /// The directory generated sources are written under.
  #[serde(default = "default_asset_path")]
  pub asset_path: PathBuf,
  /// The preamble pasted at the top of every generated unit.
  #[serde(default = "default_preamble")]
  pub generated_c_preamble: String,
  /// The microcode dialect display lists are decoded as.
  #[serde(default = "default_ucode")]
  pub gfx_ucode: String,
  /// Byte order of the image: `big` or `little`.
  #[serde(default = "default_endianness")]
  pub endianness: String,
  /// The segment kinds processing is enabled for; `all` enables everything.
  #[serde(default = "default_modes")]
  pub modes: Vec<String>,
}

fn default_asset_path() -> PathBuf {
  PathBuf::from("assets")
}

fn default_preamble() -> String {
  "#include \"ultra64.h\"".to_string()
}

fn default_ucode() -> String {
  "f3dex2".to_string()
}

fn default_endianness() -> String {
  "big".to_string()
}

fn default_modes() -> Vec<String> {
  vec!["all".to_string()]
}

impl Default for Options {
  fn default() -> Self {
    Self {
      asset_path: default_asset_path(),
      generated_c_preamble: default_preamble(),
      gfx_ucode: default_ucode(),
      endianness: default_endianness(),
      modes: default_modes(),
    }
  }
}

/// One segment entry, as it appears on disk.
#[derive(Deserialize, Serialize)]
pub struct SegmentMeta {
  /// The segment kind name; see [`SegKind::from_name`].
  ///
  /// [`SegKind::from_name`]: ../seg/enum.SegKind.html#method.from_name
  pub kind: String,
  /// The segment's name.
  pub name: String,
  /// The start offset of the segment in the image.
  pub rom_start: usize,
  /// The end offset, when the configuration pins it down directly.
  #[serde(default)]
  pub rom_end: Option<usize>,
  /// The address the range is loaded to at run time.
  #[serde(default)]
  pub vram: Option<u32>,
  /// Output directory, relative to the asset root.
  #[serde(default)]
  pub dir: PathBuf,
  /// Whether to materialize this segment at all.
  #[serde(default = "default_true")]
  pub extract: bool,
  /// Emit only raw body lines, without the declaration wrapper.
  #[serde(default)]
  pub data_only: bool,
  /// Whether referenced addresses are treated as inside this segment.
  #[serde(default = "default_true")]
  pub in_segment: bool,
  /// An element-count hint, used to estimate `rom_end` when absent.
  #[serde(default)]
  pub length: Option<usize>,
}

fn default_true() -> bool {
  true
}

/// Validated global options, in the types the decoders consume.
pub struct Opts {
  /// The directory generated sources are written under.
  pub asset_path: PathBuf,
  /// The preamble pasted at the top of every generated unit.
  pub preamble: String,
  /// The microcode dialect display lists are decoded as.
  pub ucode: Ucode,
  /// Byte order of the image.
  pub endian: Endian,
  /// The segment kinds processing is enabled for.
  pub modes: Vec<String>,
}

impl Opts {
  /// Returns true if processing is enabled for segments of kind `kind`.
  pub fn is_mode_active(&self, kind: SegKind) -> bool {
    self.modes.iter().any(|m| m == "all" || m == kind.name())
  }
}

impl Metadata {
  /// Loads and parses a metadata file.
  pub fn load(path: &Path) -> Result<Self, Error> {
    let text = fs::read_to_string(path).map_err(|cause| Error::Read {
      path: path.to_path_buf(),
      cause,
    })?;
    json5::from_str(&text).map_err(|cause| Error::Parse {
      path: path.to_path_buf(),
      cause: cause.to_string(),
    })
  }

  /// Validates this metadata into typed options and segments.
  ///
  /// `path` is only used to attribute errors back to the file they came
  /// from.
  pub fn validate(self, path: &Path) -> Result<(Opts, Vec<Segment>), Error> {
    let ucode = Ucode::from_name(&self.options.gfx_ucode).ok_or_else(|| {
      Error::UnknownUcode {
        path: path.to_path_buf(),
        ucode: self.options.gfx_ucode.clone(),
      }
    })?;

    let endian = match self.options.endianness.as_str() {
      "big" => Endian::Big,
      "little" => Endian::Little,
      other => {
        return Err(Error::UnknownEndianness {
          path: path.to_path_buf(),
          endianness: other.to_string(),
        })
      }
    };

    let opts = Opts {
      asset_path: self.options.asset_path,
      preamble: self.options.generated_c_preamble,
      ucode,
      endian,
      modes: self.options.modes,
    };

    let mut segments = Vec::with_capacity(self.segments.len());
    for meta in self.segments {
      let kind = SegKind::from_name(&meta.kind).ok_or_else(|| {
        Error::UnknownKind {
          segment: meta.name.clone(),
          kind: meta.kind.clone(),
        }
      })?;

      let mut segment = Segment::new(kind, &meta.name, meta.rom_start);
      segment.rom_end = meta.rom_end.or_else(|| {
        kind
          .estimate_size(meta.length)
          .map(|size| meta.rom_start + size)
      });
      segment.vram = meta.vram;
      segment.dir = meta.dir;
      segment.extract = meta.extract;
      segment.data_only = meta.data_only;
      segment.in_segment = meta.in_segment;
      segments.push(segment);
    }

    Ok((opts, segments))
  }
}

/// An error produced while loading or validating metadata.
#[derive(Debug)]
pub enum Error {
  /// The metadata file could not be read.
  Read {
    /// The file being read.
    path: PathBuf,
    /// The underlying failure.
    cause: io::Error,
  },
  /// The metadata file could not be parsed.
  Parse {
    /// The file being parsed.
    path: PathBuf,
    /// The parser's message.
    cause: String,
  },
  /// The configured microcode dialect is not one we know.
  UnknownUcode {
    /// The file the dialect was configured in.
    path: PathBuf,
    /// The offending name.
    ucode: String,
  },
  /// The configured endianness is not `big` or `little`.
  UnknownEndianness {
    /// The file the endianness was configured in.
    path: PathBuf,
    /// The offending name.
    endianness: String,
  },
  /// A segment names a kind this splitter cannot decode.
  UnknownKind {
    /// The segment's name.
    segment: String,
    /// The offending kind name.
    kind: String,
  },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Read { cause, .. } => write!(f, "could not read metadata: {}", cause),
      Self::Parse { cause, .. } => write!(f, "could not parse metadata: {}", cause),
      Self::UnknownUcode { ucode, .. } => {
        write!(f, "unknown gfx ucode `{}`", ucode)
      }
      Self::UnknownEndianness { endianness, .. } => {
        write!(f, "unknown endianness `{}`", endianness)
      }
      Self::UnknownKind { kind, .. } => {
        write!(f, "unknown segment kind `{}`", kind)
      }
    }
  }
}

impl error::Error for Error {
  fn cause(&self) -> error::Cause<'_> {
    match self {
      Self::Read { path, .. }
      | Self::Parse { path, .. }
      | Self::UnknownUcode { path, .. }
      | Self::UnknownEndianness { path, .. } => error::Cause::File(path),
      Self::UnknownKind { segment, .. } => error::Cause::Segment(segment),
    }
  }

  fn action(&self) -> Option<error::Action> {
    None
  }
}

#[cfg(test)]
mod test {
  use super::*;

  const META: &str = r#"{
    options: {
      asset_path: "assets",
      gfx_ucode: "f3dex",
      modes: ["gfx", "vtx"],
    },
    segments: [
      { kind: "gfx", name: "room_dl", rom_start: 0x1000, rom_end: 0x1100,
        vram: 0x06001000 },
      { kind: "vtx", name: "room_verts", rom_start: 0x1100, vram: 0x06001100,
        length: 4 },
      { kind: "bin", name: "blob", rom_start: 0x2000, rom_end: 0x2100,
        extract: false },
    ],
  }"#;

  #[test]
  fn metadata_parses_and_validates() {
    let meta: Metadata = json5::from_str(META).unwrap();
    let (opts, segments) = meta.validate(Path::new("test.json5")).unwrap();

    assert_eq!(opts.ucode, Ucode::F3dex);
    assert_eq!(opts.endian, Endian::Big);
    assert!(opts.is_mode_active(SegKind::Gfx));
    assert!(!opts.is_mode_active(SegKind::Mtx));

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].kind, SegKind::Gfx);
    assert_eq!(segments[0].rom_end, Some(0x1100));
    // Estimated from the length hint: 4 * 0x10 past the start.
    assert_eq!(segments[1].rom_end, Some(0x1140));
    assert!(!segments[2].extract);
    assert_eq!(segments[2].rom_end, Some(0x2100));
  }

  #[test]
  fn wildcard_mode_enables_everything() {
    let opts = Opts {
      asset_path: PathBuf::new(),
      preamble: String::new(),
      ucode: Ucode::F3dex2,
      endian: Endian::Big,
      modes: vec!["all".to_string()],
    };
    assert!(opts.is_mode_active(SegKind::Bin));
    assert!(opts.is_mode_active(SegKind::Light));
  }

  #[test]
  fn unknown_ucode_is_rejected() {
    let meta: Metadata = json5::from_str(
      r#"{
        options: { gfx_ucode: "f3dzex" },
        segments: [],
      }"#,
    )
    .unwrap();
    let err = meta.validate(Path::new("test.json5"));
    assert!(matches!(err, Err(Error::UnknownUcode { .. })));
  }

  #[test]
  fn unknown_kind_is_rejected() {
    let meta: Metadata = json5::from_str(
      r#"{
        segments: [{ kind: "sprite", name: "x", rom_start: 0 }],
      }"#,
    )
    .unwrap();
    let err = meta.validate(Path::new("test.json5"));
    assert!(matches!(err, Err(Error::UnknownKind { .. })));
  }
}
