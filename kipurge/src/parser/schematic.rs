//! Schematic files (`.kicad_sch`): symbol instances and sheet references.
//!
//! Format details used here:
//! - Instances: `(symbol (lib_id "Device:R") (at X Y A) (property "Footprint" "Lib:Fp" ...) ...)`
//! - Sheets: `(sheet (at X Y) (property "Sheetname" "power") (property "Sheetfile" "power.kicad_sch") ...)`
//!   KiCad 6 wrote the keys as `Sheet name` / `Sheet file`.
//! - `(lib_symbols ...)` holds cached copies of library symbols and is skipped.

use std::path::{Path, PathBuf};

use crate::parser::kicad::{parse_document, read_document, KicadFileError};
use crate::parser::sexp::SExp;

const SHEET_NAME_KEYS: &[&str] = &["Sheetname", "Sheet name"];
const SHEET_FILE_KEYS: &[&str] = &["Sheetfile", "Sheet file"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInstance {
    pub lib_id: Option<String>,
    pub reference: Option<String>,
    pub footprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInstance {
    pub name: String,
    /// Path of the child schematic as written in the file.
    pub filename: String,
}

#[derive(Debug, Clone)]
pub struct SchematicFile {
    pub path: PathBuf,
    pub symbols: Vec<SymbolInstance>,
    pub sheets: Vec<SheetInstance>,
}

impl SchematicFile {
    pub fn parse_file(path: &Path) -> Result<Self, KicadFileError> {
        let root = read_document(path, &["kicad_sch"])?;
        Ok(Self::from_sexp(path, &root))
    }

    pub fn parse_str(content: &str, path: &Path) -> Result<Self, KicadFileError> {
        let root = parse_document(content, &["kicad_sch"])?;
        Ok(Self::from_sexp(path, &root))
    }

    fn from_sexp(path: &Path, root: &SExp) -> Self {
        let symbols = root.children("symbol").map(Self::parse_symbol).collect();

        let mut sheets = Vec::new();
        for sheet in root.children("sheet") {
            let filename = first_property(sheet, SHEET_FILE_KEYS);
            match filename {
                Some(filename) if !filename.is_empty() => sheets.push(SheetInstance {
                    name: first_property(sheet, SHEET_NAME_KEYS).unwrap_or_default().to_string(),
                    filename: filename.to_string(),
                }),
                _ => tracing::warn!("{}: sheet without a file name: {}", path.display(), sheet),
            }
        }

        Self {
            path: path.to_path_buf(),
            symbols,
            sheets,
        }
    }

    fn parse_symbol(symbol: &SExp) -> SymbolInstance {
        let lib_id = symbol
            .string_value("lib_id")
            .or_else(|| symbol.first_atom())
            .map(str::to_string);

        SymbolInstance {
            lib_id,
            reference: symbol.property("Reference").map(str::to_string),
            footprint: symbol
                .property("Footprint")
                .filter(|fp| !fp.is_empty())
                .map(str::to_string),
        }
    }
}

fn first_property<'a>(node: &'a SExp, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| node.property(key))
}
