//! NSPLIT, a ROM splitting and decompilation tool.

#![deny(unsafe_code)]

use std::path::PathBuf;

use structopt::StructOpt;

use nsplit::error::Errors;
use nsplit::meta::Metadata;
use nsplit::rom::Rom;
use nsplit::seg;
use nsplit::sym::SymbolTable;

/// Splits a ROM image into typed source segments.
#[derive(StructOpt)]
#[structopt(name = "nsplit")]
struct Cli {
  /// The metadata file describing the segments to extract.
  #[structopt(parse(from_os_str))]
  metadata: PathBuf,

  /// The ROM image to split.
  #[structopt(parse(from_os_str))]
  rom: PathBuf,

  /// Overrides the asset output directory from the metadata.
  #[structopt(short, long, parse(from_os_str))]
  output: Option<PathBuf>,
}

fn main() {
  env_logger::init();
  let cli = Cli::from_args();

  let metadata = match Metadata::load(&cli.metadata) {
    Ok(metadata) => metadata,
    Err(e) => die(e),
  };
  let (mut opts, mut segments) = match metadata.validate(&cli.metadata) {
    Ok(parts) => parts,
    Err(e) => die(e),
  };
  if let Some(output) = cli.output {
    opts.asset_path = output;
  }

  let rom = match Rom::read_file(&cli.rom) {
    Ok(rom) => rom,
    Err(e) => {
      eprintln!("error: could not read {}: {}", cli.rom.display(), e);
      std::process::exit(2);
    }
  };

  let mut syms = SymbolTable::new();
  if let Err(e) = seg::split_all(&rom, &mut segments, &opts, &mut syms) {
    die(e);
  }

  // Hand the populated table over for linker-map generation.
  for sym in syms.in_address_order() {
    let size = match sym.size {
      Some(size) => format!("0x{:X}", size),
      None => "?".to_string(),
    };
    let marker = if sym.defined { "D" } else { "r" };
    println!(
      "{:08X} {} {:7} {} {}",
      sym.addr, marker, sym.ty, sym.name, size
    );
  }
}

fn die<E: nsplit::error::Error>(e: E) -> ! {
  let mut errors = Errors::new();
  errors.push(e);
  errors.dump_and_die(1);
  unreachable!()
}
