//! Project files (`.kicad_pro`).
//!
//! The project file is JSON. Only its location matters to the purge run: the
//! root schematic and the board share its stem.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const PROJECT_EXTENSION: &str = "kicad_pro";
pub const SCHEMATIC_EXTENSION: &str = "kicad_sch";
pub const BOARD_EXTENSION: &str = "kicad_pcb";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectMeta {
    pub filename: Option<String>,
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectJson {
    #[serde(default)]
    meta: Option<ProjectMeta>,
}

#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub path: PathBuf,
    pub meta: Option<ProjectMeta>,
}

impl ProjectFile {
    /// All `*.kicad_pro` files directly inside `dir`, sorted by name.
    pub fn discover(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut projects = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION) {
                projects.push(path);
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Load a project file. Unreadable or malformed JSON is logged; the file
    /// still names the root sheet through its stem.
    pub fn load(path: &Path) -> Self {
        let meta = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<ProjectJson>(&content) {
                Ok(json) => json.meta,
                Err(e) => {
                    tracing::warn!("{}: malformed project file: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("{}: cannot read project file: {}", path.display(), e);
                None
            }
        };

        let project = Self {
            path: path.to_path_buf(),
            meta,
        };
        if let Some(saved_as) = project.saved_filename() {
            if path.file_name().and_then(|n| n.to_str()) != Some(saved_as) {
                tracing::warn!("{}: project was saved as '{}'", path.display(), saved_as);
            }
        }
        project
    }

    /// File name recorded in the project's `meta` block.
    pub fn saved_filename(&self) -> Option<&str> {
        self.meta.as_ref()?.filename.as_deref()
    }

    /// Project file format version from the `meta` block.
    pub fn format_version(&self) -> Option<u32> {
        self.meta.as_ref()?.version
    }

    pub fn name(&self) -> &str {
        self.path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
    }

    pub fn root_schematic(&self) -> PathBuf {
        self.path.with_extension(SCHEMATIC_EXTENSION)
    }

    pub fn board(&self) -> PathBuf {
        self.path.with_extension(BOARD_EXTENSION)
    }
}
