//! KiPurge - find unreferenced symbols and footprints in KiCad project libraries
//!
//! The library reads a project's library tables, collects every symbol and
//! footprint the project libraries define, walks the schematic hierarchy and
//! the board for usages, and classifies each `library:name` identity as a
//! purge candidate, in use, or missing its implementation. Nothing is ever
//! modified on disk.
//!
//! # Quick Start
//!
//! ```no_run
//! use kipurge::{KiPurgeCore, PurgeOptions};
//! use std::path::Path;
//!
//! let report = KiPurgeCore::run(Path::new("my_board"), PurgeOptions::default()).unwrap();
//!
//! for entry in &report.footprints.purge_candidates {
//!     println!("{} can be deleted", entry.id);
//! }
//! ```
//!
//! # Phases
//!
//! 1. **Library indices**: `fp-lib-table` and `sym-lib-table` entries rooted at
//!    `${KIPRJMOD}` become namespaces ([`LibraryIndex`]).
//! 2. **Symbol catalog**: each `.kicad_sym` defines its symbols; a symbol's
//!    default footprint counts as a footprint usage ([`DefinitionCatalog`]).
//! 3. **Hierarchy walk**: every sheet below the root schematic, plus the board,
//!    contributes usages ([`ReferenceCollector`]).
//! 4. **Footprint scan**: every `.kicad_mod` in a `.pretty` directory defines a
//!    footprint.
//! 5. **Classification** into a [`PurgeReport`].

pub mod catalog;
pub mod collector;
pub mod context;
pub mod core;
pub mod identity;
pub mod ledger;
pub mod library;
pub mod parser;
pub mod report;

// Re-export main types
pub use crate::core::{KiPurgeCore, PurgeError, PurgeOptions};
pub use catalog::DefinitionCatalog;
pub use collector::{ReferenceCollector, SheetHierarchy};
pub use context::RunContext;
pub use identity::{QualifiedId, LIBRARY_DELIMITER};
pub use ledger::{Classification, Ledger, Purgable};
pub use library::{LibraryIndex, LibraryKind, LibraryLocation};
pub use report::{ClassifiedEntry, KindReport, PurgeReport};

/// Classify the project in `dir` with default options (convenience wrapper).
pub fn purge_project(dir: &std::path::Path) -> Result<PurgeReport, PurgeError> {
    KiPurgeCore::run(dir, PurgeOptions::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Classification, ClassifiedEntry, KiPurgeCore, LibraryKind, PurgeError, PurgeOptions, PurgeReport,
        QualifiedId,
    };
}
