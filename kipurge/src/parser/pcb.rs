//! KiCad board files (`.kicad_pcb`): placed footprint instances.
//!
//! Footprints are top-level `(footprint "Lib:Name" (layer "F.Cu") ...)` lists;
//! boards saved by KiCad 5 and earlier call them `module`.

use std::path::{Path, PathBuf};

use crate::parser::kicad::{parse_document, read_document, KicadFileError};
use crate::parser::sexp::SExp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintInstance {
    pub lib_id: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PcbFile {
    pub path: PathBuf,
    pub footprints: Vec<FootprintInstance>,
}

impl PcbFile {
    pub fn parse_file(path: &Path) -> Result<Self, KicadFileError> {
        let root = read_document(path, &["kicad_pcb"])?;
        Ok(Self::from_sexp(path, &root))
    }

    pub fn parse_str(content: &str, path: &Path) -> Result<Self, KicadFileError> {
        let root = parse_document(content, &["kicad_pcb"])?;
        Ok(Self::from_sexp(path, &root))
    }

    fn from_sexp(path: &Path, root: &SExp) -> Self {
        let footprints = root
            .values()
            .iter()
            .filter(|item| item.is_tag("footprint") || item.is_tag("module"))
            .filter_map(|item| {
                let lib_id = item.first_atom()?.to_string();
                Some(FootprintInstance {
                    lib_id,
                    reference: Self::reference(item).map(str::to_string),
                })
            })
            .collect();

        Self {
            path: path.to_path_buf(),
            footprints,
        }
    }

    fn reference(footprint: &SExp) -> Option<&str> {
        footprint.property("Reference").or_else(|| {
            // KiCad 5-7: (fp_text reference "R1" ...)
            footprint
                .children("fp_text")
                .find(|text| text.first_atom() == Some("reference"))
                .and_then(|text| text.values().get(1))
                .and_then(SExp::as_atom)
        })
    }
}
