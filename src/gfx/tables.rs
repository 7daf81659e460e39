//! Per-dialect opcode descriptor tables for the display-list decompiler.
//!
//! Each table maps the 256 possible opcode selector bytes to a descriptor
//! carrying the macro name and a handler that knows that opcode's operand
//! layout. The tables are immutable and built once per dialect.
//!
//! Not every selector is handled: entries left as placeholders fall through
//! to the raw-word handler, which emits the command as a `{{w0, w1}}`
//! literal. That output is still compilable and reassembles to the same
//! bytes, so unhandled commands cost readability, never fidelity.

use lazy_static::lazy_static;

use crate::gfx::Decoder;
use crate::gfx::Step;

/// A handler decodes one command's operand fields and emits its macro call.
pub type Handler = fn(&mut Decoder, &Op, u32, u32) -> Step;

/// Maps one opcode selector value to its decoding rule.
#[derive(Copy, Clone)]
pub struct Op {
  /// The macro (or placeholder) name for this opcode.
  pub name: &'static str,
  /// The field-extraction and formatting rule.
  pub handler: Handler,
}

/// A complete 256-entry dispatch table for one dialect.
pub struct Table {
  ops: [Op; 256],
}

impl Table {
  /// Returns the descriptor for `opcode`.
  pub fn get(&self, opcode: u8) -> &Op {
    &self.ops[opcode as usize]
  }
}

lazy_static! {
  /// Descriptor table for the fast3d dialect (and its beta revision).
  pub static ref F3D: Table = f3d();
  /// Descriptor table for the f3dex dialect (and its beta revision).
  pub static ref F3DEX: Table = f3dex();
  /// Descriptor table for the f3dex2 dialect.
  pub static ref F3DEX2: Table = f3dex2();
}

fn op(name: &'static str, handler: Handler) -> Op {
  Op { name, handler }
}

fn build(entries: Vec<(u8, Op)>) -> Table {
  let mut ops = [Op {
    name: "",
    handler: h_raw,
  }; 256];
  for (selector, entry) in entries {
    ops[selector as usize] = entry;
  }
  Table { ops }
}

/// Opcodes interpreted by the raster hardware itself, identical across all
/// microcode dialects.
fn rdp_ops() -> Vec<(u8, Op)> {
  vec![
    (0xe6, op("gsDPLoadSync", h_noarg)),
    (0xe7, op("gsDPPipeSync", h_noarg)),
    (0xe8, op("gsDPTileSync", h_noarg)),
    (0xe9, op("gsDPFullSync", h_noarg)),
    (0xf6, op("gsDPFillRectangle", h_fillrect)),
    (0xf7, op("gsDPSetFillColor", h_fillcolor)),
    (0xf8, op("gsDPSetFogColor", h_rgba_color)),
    (0xf9, op("gsDPSetBlendColor", h_rgba_color)),
    (0xfa, op("gsDPSetPrimColor", h_primcolor)),
    (0xfb, op("gsDPSetEnvColor", h_rgba_color)),
    (0xfd, op("gsDPSetTextureImage", h_img)),
    (0xfe, op("gsDPSetDepthImage", h_zimg)),
    (0xff, op("gsDPSetColorImage", h_img)),
    // Placeholders, decoded as raw words: combiner, tile, and scissor state
    // have operand layouts dense enough that symbolic forms are not worth
    // reconstructing.
    (0xe4, op("G_TEXRECT", h_raw)),
    (0xe5, op("G_TEXRECTFLIP", h_raw)),
    (0xea, op("G_SETKEYGB", h_raw)),
    (0xeb, op("G_SETKEYR", h_raw)),
    (0xec, op("G_SETCONVERT", h_raw)),
    (0xed, op("G_SETSCISSOR", h_raw)),
    (0xee, op("G_SETPRIMDEPTH", h_raw)),
    (0xef, op("G_RDPSETOTHERMODE", h_raw)),
    (0xf0, op("G_LOADTLUT", h_raw)),
    (0xf2, op("G_SETTILESIZE", h_raw)),
    (0xf3, op("G_LOADBLOCK", h_raw)),
    (0xf4, op("G_LOADTILE", h_raw)),
    (0xf5, op("G_SETTILE", h_raw)),
    (0xfc, op("G_SETCOMBINE", h_raw)),
  ]
}

fn f3d() -> Table {
  let mut ops = rdp_ops();
  ops.extend(vec![
    (0x00, op("gsSPNoOp", h_noarg)),
    (0x01, op("gsSPMatrix", h_mtx_f3d)),
    (0x03, op("gsSPMoveMem", h_movemem_f3d)),
    (0x04, op("gsSPVertex", h_vtx_f3d)),
    (0x06, op("gsSPDisplayList", h_dl)),
    (0xb4, op("G_RDPHALF_1", h_raw)),
    (0xb3, op("G_RDPHALF_2", h_raw)),
    (0xb6, op("gsSPClearGeometryMode", h_cleargeom)),
    (0xb7, op("gsSPSetGeometryMode", h_setgeom)),
    (0xb8, op("gsSPEndDisplayList", h_enddl)),
    (0xb9, op("G_SETOTHERMODE_L", h_raw)),
    (0xba, op("G_SETOTHERMODE_H", h_raw)),
    (0xbb, op("gsSPTexture", h_texture_f3d)),
    (0xbc, op("G_MOVEWORD", h_raw)),
    (0xbd, op("G_POPMTX", h_raw)),
    (0xbe, op("G_CULLDL", h_raw)),
    (0xbf, op("gsSP1Triangle", h_tri1_f3d)),
    (0xc0, op("gsDPNoOp", h_noop_tag)),
  ]);
  build(ops)
}

fn f3dex() -> Table {
  let mut ops = rdp_ops();
  ops.extend(vec![
    (0x00, op("gsSPNoOp", h_noarg)),
    (0x01, op("gsSPMatrix", h_mtx_f3d)),
    (0x03, op("gsSPMoveMem", h_movemem_f3d)),
    (0x04, op("gsSPVertex", h_vtx_f3dex)),
    (0x06, op("gsSPDisplayList", h_dl)),
    (0xb1, op("gsSP2Triangles", h_tri2)),
    (0xb2, op("G_MODIFYVTX", h_raw)),
    (0xb3, op("G_RDPHALF_2", h_raw)),
    (0xb4, op("G_RDPHALF_1", h_raw)),
    (0xb5, op("G_LINE3D", h_raw)),
    (0xb6, op("gsSPClearGeometryMode", h_cleargeom)),
    (0xb7, op("gsSPSetGeometryMode", h_setgeom)),
    (0xb8, op("gsSPEndDisplayList", h_enddl)),
    (0xb9, op("G_SETOTHERMODE_L", h_raw)),
    (0xba, op("G_SETOTHERMODE_H", h_raw)),
    (0xbb, op("gsSPTexture", h_texture_f3d)),
    (0xbc, op("G_MOVEWORD", h_raw)),
    (0xbd, op("G_POPMTX", h_raw)),
    (0xbe, op("G_CULLDL", h_raw)),
    (0xbf, op("gsSP1Triangle", h_tri1_f3dex)),
    (0xc0, op("gsDPNoOp", h_noop_tag)),
  ]);
  build(ops)
}

fn f3dex2() -> Table {
  let mut ops = rdp_ops();
  ops.extend(vec![
    (0x00, op("gsDPNoOp", h_noop_tag)),
    (0x01, op("gsSPVertex", h_vtx_f3dex2)),
    (0x02, op("G_MODIFYVTX", h_raw)),
    (0x03, op("gsSPCullDisplayList", h_culldl_f3dex2)),
    (0x04, op("G_BRANCH_Z", h_raw)),
    (0x05, op("gsSP1Triangle", h_tri1_f3dex2)),
    (0x06, op("gsSP2Triangles", h_tri2)),
    (0x07, op("G_QUAD", h_raw)),
    (0xd7, op("gsSPTexture", h_texture_f3dex2)),
    (0xd8, op("G_POPMTX", h_raw)),
    (0xd9, op("gsSPGeometryMode", h_geom_f3dex2)),
    (0xda, op("gsSPMatrix", h_mtx_f3dex2)),
    (0xdb, op("G_MOVEWORD", h_raw)),
    (0xdc, op("gsSPMoveMem", h_movemem_f3dex2)),
    (0xde, op("gsSPDisplayList", h_dl)),
    (0xdf, op("gsSPEndDisplayList", h_enddl)),
    (0xe1, op("G_RDPHALF_1", h_raw)),
    (0xe2, op("G_SETOTHERMODE_L", h_raw)),
    (0xe3, op("G_SETOTHERMODE_H", h_raw)),
    (0xf1, op("G_RDPHALF_2", h_raw)),
  ]);
  build(ops)
}

fn im_fmt(fmt: u32) -> &'static str {
  match fmt {
    0 => "G_IM_FMT_RGBA",
    1 => "G_IM_FMT_YUV",
    2 => "G_IM_FMT_CI",
    3 => "G_IM_FMT_IA",
    _ => "G_IM_FMT_I",
  }
}

fn im_siz(siz: u32) -> &'static str {
  match siz {
    0 => "G_IM_SIZ_4b",
    1 => "G_IM_SIZ_8b",
    2 => "G_IM_SIZ_16b",
    _ => "G_IM_SIZ_32b",
  }
}

fn h_raw(d: &mut Decoder, op: &Op, w0: u32, w1: u32) -> Step {
  if op.name.is_empty() {
    log::debug!("unrecognized display-list opcode 0x{:02X}", w0 >> 24);
  }
  d.emit(&format!("{{{{0x{:08X}, 0x{:08X}}}}}", w0, w1));
  Step::Continue
}

fn h_noarg(d: &mut Decoder, op: &Op, _w0: u32, _w1: u32) -> Step {
  d.emit(&format!("{}()", op.name));
  Step::Continue
}

fn h_enddl(d: &mut Decoder, op: &Op, _w0: u32, _w1: u32) -> Step {
  d.emit(&format!("{}()", op.name));
  Step::Stop
}

fn h_noop_tag(d: &mut Decoder, op: &Op, _w0: u32, w1: u32) -> Step {
  if w1 == 0 {
    d.emit(&format!("{}()", op.name));
  } else {
    d.emit(&format!("gsDPNoOpTag(0x{:08X})", w1));
  }
  Step::Continue
}

fn h_dl(d: &mut Decoder, op: &Op, w0: u32, w1: u32) -> Step {
  let name = d.resolve_dl(w1);
  match (w0 >> 16) & 0xff {
    0 => d.emit(&format!("gsSPDisplayList({})", name)),
    1 => d.emit(&format!("gsSPBranchList({})", name)),
    _ => return h_raw(d, op, w0, w1),
  }
  Step::Continue
}

// The three vertex-load encodings differ only in where the count and base
// index live.

fn h_vtx_f3d(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let count = ((w0 >> 20) & 0xf) + 1;
  let v0 = (w0 >> 16) & 0xf;
  let target = d.resolve_vtx(w1, count);
  d.emit(&format!("gsSPVertex({}, {}, {})", target, count, v0));
  Step::Continue
}

fn h_vtx_f3dex(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let count = (w0 >> 10) & 0x3f;
  let v0 = ((w0 >> 16) & 0xff) / 2;
  let target = d.resolve_vtx(w1, count);
  d.emit(&format!("gsSPVertex({}, {}, {})", target, count, v0));
  Step::Continue
}

fn h_vtx_f3dex2(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let count = (w0 >> 12) & 0xff;
  let v0 = ((w0 >> 1) & 0x7f).wrapping_sub(count);
  let target = d.resolve_vtx(w1, count);
  d.emit(&format!("gsSPVertex({}, {}, {})", target, count, v0));
  Step::Continue
}

fn h_mtx_f3d(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let params = (w0 >> 16) & 0xff;
  let target = d.resolve_ref(w1);
  d.emit(&format!("gsSPMatrix({}, 0x{:02X})", target, params));
  Step::Continue
}

fn h_mtx_f3dex2(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  // G_MTX_PUSH is stored inverted in this dialect.
  let params = (w0 & 0xff) ^ 0x01;
  let target = d.resolve_ref(w1);
  d.emit(&format!("gsSPMatrix({}, 0x{:02X})", target, params));
  Step::Continue
}

fn h_movemem_f3d(d: &mut Decoder, op: &Op, w0: u32, w1: u32) -> Step {
  let index = (w0 >> 16) & 0xff;
  match index {
    // G_MV_VIEWPORT
    0x80 => {
      let target = d.resolve_ref(w1);
      d.emit(&format!("gsSPViewport({})", target));
    }
    // G_MV_L0 through G_MV_L7, at even offsets from 0x86.
    0x86..=0x94 if index % 2 == 0 => {
      let light = (index - 0x86) / 2 + 1;
      let name = d.resolve_data(w1);
      d.emit(&format!("gsSPLight({}, {})", name, light));
    }
    _ => return h_raw(d, op, w0, w1),
  }
  Step::Continue
}

fn h_movemem_f3dex2(d: &mut Decoder, op: &Op, w0: u32, w1: u32) -> Step {
  let index = w0 & 0xff;
  let offset = ((w0 >> 8) & 0xff) * 8;
  match index {
    // G_MV_VIEWPORT
    8 => {
      let target = d.resolve_ref(w1);
      d.emit(&format!("gsSPViewport({})", target));
    }
    // G_MV_LIGHT: lights sit at 0x18-byte strides past the two lookat
    // entries.
    10 if offset >= 0x30 && (offset - 0x30) % 0x18 == 0 => {
      let light = (offset - 0x30) / 0x18 + 1;
      let name = d.resolve_data(w1);
      d.emit(&format!("gsSPLight({}, {})", name, light));
    }
    _ => return h_raw(d, op, w0, w1),
  }
  Step::Continue
}

fn h_tri1_f3d(d: &mut Decoder, _op: &Op, _w0: u32, w1: u32) -> Step {
  // fast3d scales vertex indices by the vertex stride of 10.
  let v0 = ((w1 >> 16) & 0xff) / 10;
  let v1 = ((w1 >> 8) & 0xff) / 10;
  let v2 = (w1 & 0xff) / 10;
  d.emit(&format!("gsSP1Triangle({}, {}, {}, 0)", v0, v1, v2));
  Step::Continue
}

fn h_tri1_f3dex(d: &mut Decoder, _op: &Op, _w0: u32, w1: u32) -> Step {
  let v0 = ((w1 >> 16) & 0xff) / 2;
  let v1 = ((w1 >> 8) & 0xff) / 2;
  let v2 = (w1 & 0xff) / 2;
  d.emit(&format!("gsSP1Triangle({}, {}, {}, 0)", v0, v1, v2));
  Step::Continue
}

fn h_tri1_f3dex2(d: &mut Decoder, _op: &Op, w0: u32, _w1: u32) -> Step {
  let v0 = ((w0 >> 16) & 0xff) / 2;
  let v1 = ((w0 >> 8) & 0xff) / 2;
  let v2 = (w0 & 0xff) / 2;
  d.emit(&format!("gsSP1Triangle({}, {}, {}, 0)", v0, v1, v2));
  Step::Continue
}

fn h_tri2(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let v = [
    ((w0 >> 16) & 0xff) / 2,
    ((w0 >> 8) & 0xff) / 2,
    (w0 & 0xff) / 2,
    ((w1 >> 16) & 0xff) / 2,
    ((w1 >> 8) & 0xff) / 2,
    (w1 & 0xff) / 2,
  ];
  d.emit(&format!(
    "gsSP2Triangles({}, {}, {}, 0, {}, {}, {}, 0)",
    v[0], v[1], v[2], v[3], v[4], v[5]
  ));
  Step::Continue
}

fn h_culldl_f3dex2(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let vstart = (w0 & 0xffff) / 2;
  let vend = (w1 & 0xffff) / 2;
  d.emit(&format!("gsSPCullDisplayList({}, {})", vstart, vend));
  Step::Continue
}

fn h_texture_f3d(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let level = (w0 >> 11) & 0x7;
  let tile = (w0 >> 8) & 0x7;
  let on = w0 & 0xff;
  emit_texture(d, w1, level, tile, on);
  Step::Continue
}

fn h_texture_f3dex2(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let level = (w0 >> 11) & 0x7;
  let tile = (w0 >> 8) & 0x7;
  let on = (w0 >> 1) & 0x7f;
  emit_texture(d, w1, level, tile, on);
  Step::Continue
}

fn emit_texture(d: &mut Decoder, w1: u32, level: u32, tile: u32, on: u32) {
  let s = (w1 >> 16) & 0xffff;
  let t = w1 & 0xffff;
  let on = if on == 0 { "G_OFF" } else { "G_ON" };
  d.emit(&format!(
    "gsSPTexture(0x{:04X}, 0x{:04X}, {}, {}, {})",
    s, t, level, tile, on
  ));
}

fn h_setgeom(d: &mut Decoder, _op: &Op, _w0: u32, w1: u32) -> Step {
  d.emit(&format!("gsSPSetGeometryMode(0x{:08X})", w1));
  Step::Continue
}

fn h_cleargeom(d: &mut Decoder, _op: &Op, _w0: u32, w1: u32) -> Step {
  d.emit(&format!("gsSPClearGeometryMode(0x{:08X})", w1));
  Step::Continue
}

fn h_geom_f3dex2(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  // The clear mask is stored inverted in the low 24 bits.
  let clear = !w0 & 0x00ff_ffff;
  d.emit(&format!("gsSPGeometryMode(0x{:08X}, 0x{:08X})", clear, w1));
  Step::Continue
}

fn h_fillrect(d: &mut Decoder, _op: &Op, w0: u32, w1: u32) -> Step {
  let lrx = (w0 >> 14) & 0x3ff;
  let lry = (w0 >> 2) & 0x3ff;
  let ulx = (w1 >> 14) & 0x3ff;
  let uly = (w1 >> 2) & 0x3ff;
  d.emit(&format!(
    "gsDPFillRectangle({}, {}, {}, {})",
    ulx, uly, lrx, lry
  ));
  Step::Continue
}

fn h_fillcolor(d: &mut Decoder, op: &Op, _w0: u32, w1: u32) -> Step {
  d.emit(&format!("{}(0x{:08X})", op.name, w1));
  Step::Continue
}

fn h_rgba_color(d: &mut Decoder, op: &Op, _w0: u32, w1: u32) -> Step {
  let [r, g, b, a] = w1.to_be_bytes();
  d.emit(&format!("{}({}, {}, {}, {})", op.name, r, g, b, a));
  Step::Continue
}

fn h_primcolor(d: &mut Decoder, op: &Op, w0: u32, w1: u32) -> Step {
  let minlod = (w0 >> 8) & 0xff;
  let lodfrac = w0 & 0xff;
  let [r, g, b, a] = w1.to_be_bytes();
  d.emit(&format!(
    "{}({}, {}, {}, {}, {}, {})",
    op.name, minlod, lodfrac, r, g, b, a
  ));
  Step::Continue
}

// Texture and color image pointers share one operand layout.
fn h_img(d: &mut Decoder, op: &Op, w0: u32, w1: u32) -> Step {
  let fmt = (w0 >> 21) & 0x7;
  let siz = (w0 >> 19) & 0x3;
  let width = (w0 & 0xfff) + 1;
  let name = d.resolve_data(w1);
  d.emit(&format!(
    "{}({}, {}, {}, {})",
    op.name,
    im_fmt(fmt),
    im_siz(siz),
    width,
    name
  ));
  Step::Continue
}

fn h_zimg(d: &mut Decoder, op: &Op, _w0: u32, w1: u32) -> Step {
  let name = d.resolve_data(w1);
  d.emit(&format!("{}({})", op.name, name));
  Step::Continue
}
