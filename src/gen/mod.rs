//! Generated-code assembly, the text-layout contract shared by every codec.
//!
//! Each decoder produces an ordered body of source lines; this module wraps
//! that body into a complete compilable unit: the configured preamble, a
//! declaration head built from the data type and symbol name, and the
//! matching terminator. Keeping the layout in one place means every emitted
//! file agrees on shape, and the codecs only worry about their own values.

use std::fmt;

pub mod light;
pub mod mtx;
pub mod vtx;

/// A fixed-record codec received a byte range of the wrong size.
#[derive(Debug)]
pub struct BadLength {
  /// A description of the length the codec required.
  pub expected: &'static str,
  /// The length it was actually given.
  pub got: usize,
}

impl fmt::Display for BadLength {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "expected {}, got 0x{:X} bytes", self.expected, self.got)
  }
}

/// The shape of a generated declaration.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Shape {
  /// A single value; the first body line shares the declaration's line.
  Scalar,
  /// An array, with an explicit element count or an empty-bracket form when
  /// the count is not statically known.
  Array(Option<usize>),
}

/// A declaration to wrap a body of lines into.
#[derive(Clone, Debug)]
pub struct Decl<'a> {
  /// The C data type being declared, e.g. `Mtx` or `Vtx`.
  pub data_type: &'a str,
  /// The name of the defined symbol.
  pub name: &'a str,
  /// Scalar or array form.
  pub shape: Shape,
  /// When set, the preamble and declaration wrapper are suppressed and only
  /// the raw body is emitted, for splicing into a caller-owned declaration.
  pub data_only: bool,
}

/// Assembles a complete text unit from a declaration and its body.
///
/// This is a pure function of its inputs: calling it twice with identical
/// arguments produces byte-identical output. The result always ends in
/// exactly one newline.
pub fn assemble(decl: &Decl, preamble: &str, body: Vec<String>) -> String {
  let mut lines = Vec::with_capacity(body.len() + 4);
  let mut body = body;

  if !decl.data_only {
    lines.push(preamble.to_string());
    lines.push(String::new());

    let mut head = format!("{} {}", decl.data_type, decl.name);
    match decl.shape {
      Shape::Array(Some(count)) => head.push_str(&format!("[{}] = {{", count)),
      Shape::Array(None) => head.push_str("[] = {"),
      Shape::Scalar => head.push_str(" = "),
    }
    lines.push(head);

    // Scalar declarations share their line with the first value.
    if decl.shape == Shape::Scalar {
      let first = body.remove(0);
      lines.last_mut().unwrap().push_str(&first);
    }
  }

  lines.extend(body);

  if !decl.data_only {
    match decl.shape {
      Shape::Array(_) => lines.push("};".to_string()),
      Shape::Scalar => lines.last_mut().unwrap().push(';'),
    }
  }

  // Enforce a newline at end of file.
  lines.push(String::new());
  lines.join("\n")
}

#[cfg(test)]
mod test {
  use super::*;

  const PREAMBLE: &str = "#include \"header.h\"";

  #[test]
  fn scalar_declaration() {
    let decl = Decl {
      data_type: "Mtx",
      name: "mtx_80100000",
      shape: Shape::Scalar,
      data_only: false,
    };
    let body = vec!["{{".to_string(), "}}".to_string()];
    let text = assemble(&decl, PREAMBLE, body);
    assert_eq!(
      text,
      "#include \"header.h\"\n\nMtx mtx_80100000 = {{\n}};\n"
    );
  }

  #[test]
  fn array_with_count() {
    let decl = Decl {
      data_type: "Vtx",
      name: "vtx_80100000",
      shape: Shape::Array(Some(2)),
      data_only: false,
    };
    let body = vec!["    a,".to_string(), "    b,".to_string()];
    let text = assemble(&decl, PREAMBLE, body);
    assert_eq!(
      text,
      "#include \"header.h\"\n\nVtx vtx_80100000[2] = {\n    a,\n    b,\n};\n"
    );
  }

  #[test]
  fn array_without_count() {
    let decl = Decl {
      data_type: "Gfx",
      name: "gfx_80100000",
      shape: Shape::Array(None),
      data_only: false,
    };
    let text = assemble(&decl, PREAMBLE, vec!["    x,".to_string()]);
    assert!(text.contains("Gfx gfx_80100000[] = {\n"));
    assert!(text.ends_with("};\n"));
  }

  #[test]
  fn data_only_emits_bare_body() {
    let decl = Decl {
      data_type: "Gfx",
      name: "gfx_80100000",
      shape: Shape::Array(None),
      data_only: true,
    };
    let text = assemble(&decl, PREAMBLE, vec!["    x,".to_string()]);
    assert_eq!(text, "    x,\n");
  }

  #[test]
  fn assembly_is_idempotent() {
    let decl = Decl {
      data_type: "Lights1",
      name: "D_80100000",
      shape: Shape::Scalar,
      data_only: false,
    };
    let body = || vec!["gdSPDefLights1(".to_string(), ")".to_string()];
    assert_eq!(
      assemble(&decl, PREAMBLE, body()),
      assemble(&decl, PREAMBLE, body())
    );
  }
}
