//! Library tables (`fp-lib-table`, `sym-lib-table`).
//!
//! Format:
//! ```text
//! (fp_lib_table
//!   (version 7)
//!   (lib (name "LIBB")(type "KiCad")(uri "${KIPRJMOD}/LIBB.pretty")(options "")(descr ""))
//! )
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::library::LibraryKind;
use crate::parser::kicad::{parse_document, read_document, KicadFileError};
use crate::parser::sexp::SExp;

/// One `(lib ...)` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibTableEntry {
    pub name: String,
    pub lib_type: String,
    pub uri: String,
    pub options: String,
    pub descr: String,
}

#[derive(Debug, Clone)]
pub struct LibTable {
    pub path: PathBuf,
    pub kind: LibraryKind,
    pub entries: Vec<LibTableEntry>,
}

impl LibTable {
    pub fn parse_file(path: &Path, kind: LibraryKind) -> Result<Self, KicadFileError> {
        let root = read_document(path, &[kind.table_root_tag()])?;
        Ok(Self::from_sexp(path, kind, &root))
    }

    pub fn parse_str(content: &str, path: &Path, kind: LibraryKind) -> Result<Self, KicadFileError> {
        let root = parse_document(content, &[kind.table_root_tag()])?;
        Ok(Self::from_sexp(path, kind, &root))
    }

    fn from_sexp(path: &Path, kind: LibraryKind, root: &SExp) -> Self {
        let mut entries = Vec::new();
        for lib in root.find_all("lib") {
            match Self::parse_entry(lib) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(
                    "{}: skipping library entry without name/type/uri: {}",
                    path.display(),
                    lib
                ),
            }
        }

        Self {
            path: path.to_path_buf(),
            kind,
            entries,
        }
    }

    fn parse_entry(lib: &SExp) -> Option<LibTableEntry> {
        let field = |key: &str| lib.string_value(key).map(str::to_string);
        Some(LibTableEntry {
            name: field("name")?,
            lib_type: field("type")?,
            uri: field("uri")?,
            options: field("options").unwrap_or_default(),
            descr: field("descr").unwrap_or_default(),
        })
    }
}
