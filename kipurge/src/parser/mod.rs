pub mod kicad;
pub mod lib_table;
pub mod pcb;
pub mod project;
pub mod schematic;
pub mod sexp;
pub mod symbol_lib;

// Re-export for convenience
pub use kicad::{read_document, KicadFileError};
pub use lib_table::{LibTable, LibTableEntry};
pub use pcb::{FootprintInstance, PcbFile};
pub use project::ProjectFile;
pub use schematic::{SchematicFile, SheetInstance, SymbolInstance};
pub use sexp::{parse_sexp, ParseError, SExp, SExpParser};
pub use symbol_lib::{SymbolDefinition, SymbolLibraryFile};
