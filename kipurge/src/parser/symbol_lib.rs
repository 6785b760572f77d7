//! Symbol library files (`.kicad_sym`).
//!
//! Only top-level `(symbol "Name" ...)` lists are definitions. The unit
//! bodies nested inside them (`Name_0_1`, `Name_1_1`) share the tag but are
//! part of the parent definition.

use std::path::{Path, PathBuf};

use crate::parser::kicad::{parse_document, read_document, KicadFileError};
use crate::parser::sexp::SExp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDefinition {
    pub name: String,
    /// Default footprint assignment, empty values dropped.
    pub footprint: Option<String>,
    pub extends: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SymbolLibraryFile {
    pub path: PathBuf,
    pub symbols: Vec<SymbolDefinition>,
}

impl SymbolLibraryFile {
    pub fn parse_file(path: &Path) -> Result<Self, KicadFileError> {
        let root = read_document(path, &["kicad_symbol_lib"])?;
        Ok(Self::from_sexp(path, &root))
    }

    pub fn parse_str(content: &str, path: &Path) -> Result<Self, KicadFileError> {
        let root = parse_document(content, &["kicad_symbol_lib"])?;
        Ok(Self::from_sexp(path, &root))
    }

    fn from_sexp(path: &Path, root: &SExp) -> Self {
        let symbols = root
            .children("symbol")
            .filter_map(|symbol| {
                let name = symbol.first_atom()?.to_string();
                Some(SymbolDefinition {
                    name,
                    footprint: symbol
                        .property("Footprint")
                        .filter(|fp| !fp.is_empty())
                        .map(str::to_string),
                    extends: symbol.string_value("extends").map(str::to_string),
                })
            })
            .collect();

        Self {
            path: path.to_path_buf(),
            symbols,
        }
    }
}
