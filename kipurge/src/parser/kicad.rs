//! Shared loading for KiCad S-expression files.
//!
//! Every KiCad 6+ file this crate reads is a single list whose tag names the
//! file type (`kicad_sch`, `kicad_symbol_lib`, `fp_lib_table`, ...). Readers
//! go through [`read_document`] so the root tag is always checked.

use std::path::Path;

use thiserror::Error;

use crate::parser::sexp::{parse_sexp, ParseError, SExp};

#[derive(Debug, Error)]
pub enum KicadFileError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

/// Read `path` and parse it, requiring one of `root_tags` as the root tag.
pub fn read_document(path: &Path, root_tags: &[&str]) -> Result<SExp, KicadFileError> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content, root_tags)
}

/// Parse `content`, requiring one of `root_tags` as the root tag.
pub fn parse_document(content: &str, root_tags: &[&str]) -> Result<SExp, KicadFileError> {
    let root = parse_sexp(content)?;
    match root.tag() {
        Some(tag) if root_tags.contains(&tag) => Ok(root),
        Some(tag) => Err(KicadFileError::InvalidFormat(format!(
            "Expected {}, found {}",
            root_tags.join(" or "),
            tag
        ))),
        None => Err(KicadFileError::InvalidFormat(format!(
            "Expected {} root",
            root_tags.join(" or ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_tag_is_checked() {
        assert!(parse_document("(kicad_sch (version 20231120))", &["kicad_sch"]).is_ok());

        let err = parse_document("(kicad_pcb)", &["kicad_sch"]).unwrap_err();
        assert!(err.to_string().contains("Expected kicad_sch, found kicad_pcb"));

        assert!(matches!(
            parse_document("kicad_sch", &["kicad_sch"]),
            Err(KicadFileError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_document(Path::new("does/not/exist.kicad_sch"), &["kicad_sch"]).unwrap_err();
        assert!(matches!(err, KicadFileError::Io(_)));
    }
}
