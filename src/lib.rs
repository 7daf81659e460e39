//! NSPLIT, a ROM splitting and decompilation tool.
//!
//! NSPLIT dismantles a cartridge ROM image into a tree of typed segments,
//! re-emitting each recognized region as compilable C source annotated with
//! resolved symbolic names, so the image can be rebuilt byte-identical from
//! source.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod gen;
pub mod gfx;
pub mod meta;
pub mod rom;
pub mod seg;
pub mod sym;
