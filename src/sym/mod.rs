//! The global symbol table, which unifies address references across segments.
//!
//! Every decoder resolves the addresses it encounters through one shared
//! [`SymbolTable`]: the segment being split registers a defining symbol for
//! itself, and the display-list decompiler deposits reference symbols for
//! every pointer operand it sees. At the end of a run the fully populated
//! table is handed off to the linker-map generator.
//!
//! The table is keyed by `(address, type)` pairs: two symbols of different
//! types may coexist at one address, and typed lookups only ever match their
//! own type. Symbols are created lazily on first reference and never deleted.
//!
//! [`SymbolTable`]: struct.SymbolTable.html

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

/// The type of data a symbol refers to.
///
/// This is a small closed set: the splitter only understands the handful of
/// record formats it can decode, plus a generic "some data" fallback.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum SymType {
  /// Generic binary data of unknown shape.
  Data,
  /// A display list (an array of graphics commands).
  Gfx,
  /// A vertex array.
  Vtx,
  /// A transform matrix.
  Mtx,
  /// No type information at all.
  Untyped,
}

impl SymType {
  /// Returns the prefix used when generating a name for a symbol of this
  /// type.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Data => "D",
      Self::Gfx => "gfx",
      Self::Vtx => "vtx",
      Self::Mtx => "mtx",
      Self::Untyped => "sym",
    }
  }
}

impl fmt::Display for SymType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      Self::Data => "data",
      Self::Gfx => "gfx",
      Self::Vtx => "vtx",
      Self::Mtx => "mtx",
      Self::Untyped => "untyped",
    };
    write!(f, "{}", name)
  }
}

/// A named reference to a load address.
#[derive(Clone, Debug)]
pub struct Symbol {
  /// The absolute load address this symbol refers to.
  pub addr: u32,
  /// The symbol's name, as it appears in generated source.
  pub name: String,
  /// The type of data at `addr`.
  pub ty: SymType,
  /// The size of the referenced data in bytes, when known.
  pub size: Option<u32>,
  /// Whether the segment currently being processed owns this symbol's
  /// definition. A defined symbol gets a declaration; a mere reference does
  /// not.
  pub defined: bool,
  /// Whether `addr` falls inside the active segment's own range. References
  /// to out-of-segment addresses are still emitted by name, but the flag is
  /// carried through to the linker-map generator, which must declare them
  /// externally.
  pub in_segment: bool,
}

impl Symbol {
  fn generated(addr: u32, ty: SymType) -> Self {
    Self {
      addr,
      name: format!("{}_{:08X}", ty.prefix(), addr),
      ty,
      size: None,
      defined: false,
      in_segment: false,
    }
  }
}

/// The address-to-symbol registry shared by every decoder in a run.
///
/// There is at most one canonical symbol per `(address, type)` pair; repeated
/// references to the same address with the same type always resolve to the
/// same symbol, which is what makes the emitted names deterministic.
#[derive(Clone, Debug)]
pub struct SymbolTable {
  table: HashMap<(u32, SymType), Symbol>,
}

impl SymbolTable {
  /// Creates a new, empty `SymbolTable`.
  pub fn new() -> Self {
    Self {
      table: HashMap::new(),
    }
  }

  /// Returns the symbol at `(addr, ty)`, creating it if necessary.
  ///
  /// A freshly created symbol gets a deterministic generated name derived
  /// from its address and type. An existing symbol is updated rather than
  /// replaced: `defined = true` promotes a previous mere reference to a
  /// definition, and a known `size` fills in a previously unknown one.
  ///
  /// This operation never fails; an address collision across different types
  /// simply produces two coexisting symbols.
  pub fn create_or_get(
    &mut self,
    addr: u32,
    ty: SymType,
    size: Option<u32>,
    defined: bool,
    in_segment: bool,
  ) -> &Symbol {
    match self.table.entry((addr, ty)) {
      Entry::Vacant(e) => {
        let mut sym = Symbol::generated(addr, ty);
        sym.size = size;
        sym.defined = defined;
        sym.in_segment = in_segment;
        e.insert(sym)
      }
      Entry::Occupied(e) => {
        let sym = e.into_mut();
        if defined {
          sym.defined = true;
          sym.in_segment = sym.in_segment || in_segment;
        }
        if sym.size.is_none() {
          sym.size = size;
        }
        sym
      }
    }
  }

  /// Looks up the symbol of exactly type `ty` at `addr`.
  ///
  /// Returns `None` if no symbol of that type exists there, even when
  /// other-typed symbols do; the caller decides whether to fall back to a
  /// generic symbol or treat the address as unknown.
  pub fn find_typed(&self, addr: u32, ty: SymType) -> Option<&Symbol> {
    self.table.get(&(addr, ty))
  }

  /// Searches for a symbol of type `ty` whose sized range contains `addr`.
  ///
  /// This recovers the owning symbol when a reference points into the middle
  /// of a known array rather than at its start. Symbols without a known size
  /// only match at their base address. When ranges overlap, the symbol with
  /// the highest base address not above `addr` wins.
  pub fn find_containing(&self, addr: u32, ty: SymType) -> Option<&Symbol> {
    self
      .table
      .values()
      .filter(|sym| sym.ty == ty && sym.addr <= addr)
      .filter(|sym| match sym.size {
        Some(size) => addr < sym.addr + size,
        None => addr == sym.addr,
      })
      .max_by_key(|sym| sym.addr)
  }

  /// Returns all symbols, ordered by address and then by type.
  ///
  /// This is the order the linker-map generator consumes them in.
  pub fn in_address_order(&self) -> Vec<&Symbol> {
    let mut syms: Vec<_> = self.table.values().collect();
    syms.sort_by_key(|sym| (sym.addr, sym.ty));
    syms
  }

  /// Returns the number of symbols in the table.
  pub fn len(&self) -> usize {
    self.table.len()
  }

  /// Returns true if no symbols have been created yet.
  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}
