//! List the symbols and footprints a project never uses.

use kipurge::prelude::*;
use std::path::Path;

fn main() -> Result<(), PurgeError> {
    let dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let dir = Path::new(&dir);

    if !dir.is_dir() {
        eprintln!("Directory not found: {}", dir.display());
        eprintln!("Usage: cargo run --example list_candidates [path/to/project]");
        std::process::exit(1);
    }

    let report = KiPurgeCore::run(dir, PurgeOptions::default())?;

    for kind in [LibraryKind::Symbol, LibraryKind::Footprint] {
        let entries = report.kind(kind).entries(Classification::PurgeCandidate);
        println!("Unused {} items: {}", kind, entries.len());
        for entry in entries {
            match &entry.implementation {
                Some(path) => println!("  {}  ({})", entry.id, path.display()),
                None => println!("  {}", entry.id),
            }
        }
    }

    let missing = report.symbols.missing_implementation.len() + report.footprints.missing_implementation.len();
    if missing > 0 {
        println!();
        println!("{} referenced items have no implementation", missing);
    }

    Ok(())
}
