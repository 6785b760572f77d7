//! Run orchestration shared by the CLI and library users.

use std::path::{Path, PathBuf};

use crate::catalog::DefinitionCatalog;
use crate::collector::ReferenceCollector;
use crate::context::RunContext;
use crate::library::{LibraryIndex, LibraryKind};
use crate::parser::project::ProjectFile;
use crate::report::PurgeReport;

#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error("Malformed identity '{raw}': expected 'library:name'")]
    MalformedIdentity { raw: String },
    #[error("Library '{name}': cannot resolve uri '{uri}' relative to the project")]
    UnresolvableLibraryPath { name: String, uri: String },
    #[error("Footprint library '{name}': directory {} does not exist", .path.display())]
    DirectoryMissing { name: String, path: PathBuf },
    #[error("Symbol library '{name}': file {} does not exist", .path.display())]
    LibraryFileMissing { name: String, path: PathBuf },
    #[error("Sheet '{sheet}': file {} does not exist", .path.display())]
    SheetFileMissing { sheet: String, path: PathBuf },
    #[error("Malformed library table {}: {reason}", .path.display())]
    MalformedLibraryTable { path: PathBuf, reason: String },
    #[error("Cyclic sheet hierarchy: {}", format_cycle(.cycle))]
    CyclicHierarchy { cycle: Vec<PathBuf> },
    #[error("No .kicad_pro project file found in {}", .0.display())]
    ProjectFileNotFound(PathBuf),
    #[error("Root schematic {} not found", .0.display())]
    RootSchematicNotFound(PathBuf),
    #[error("Parse error in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PurgeError {
    /// Whether the error aborts the run. Everything else is logged and the
    /// offending item skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PurgeError::CyclicHierarchy { .. }
                | PurgeError::ProjectFileNotFound(_)
                | PurgeError::RootSchematicNotFound(_)
                | PurgeError::MalformedLibraryTable { .. }
        )
    }
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Log an error the run continues past.
pub(crate) fn warn_recovered(err: PurgeError) {
    debug_assert!(!err.is_fatal(), "fatal error treated as recoverable: {err}");
    tracing::warn!("{}", err);
}

/// Options for a purge run.
#[derive(Clone, Debug)]
pub struct PurgeOptions {
    /// Prefix of library-table uris that stands for the project directory.
    pub project_root_token: String,
    /// Library-table `type` handled by the run; other types are ignored.
    pub library_type: String,
    pub symbol_table: String,
    pub footprint_table: String,
    pub footprint_extension: String,
    /// Count footprints placed on the board as references.
    pub include_pcb: bool,
}

impl Default for PurgeOptions {
    fn default() -> Self {
        Self {
            project_root_token: "${KIPRJMOD}/".to_string(),
            library_type: "KiCad".to_string(),
            symbol_table: "sym-lib-table".to_string(),
            footprint_table: "fp-lib-table".to_string(),
            footprint_extension: "kicad_mod".to_string(),
            include_pcb: true,
        }
    }
}

/// Purge API used by the CLI.
pub struct KiPurgeCore;

impl KiPurgeCore {
    /// Resolve both library tables of the project in `dir`.
    pub fn load_libraries(dir: &Path, options: PurgeOptions) -> Result<RunContext, PurgeError> {
        let mut ctx = RunContext::new(dir, options);
        Self::load_indices(&mut ctx)?;
        Ok(ctx)
    }

    /// Run every phase over the project in `dir` and return the filled
    /// context.
    pub fn collect(dir: &Path, options: PurgeOptions) -> Result<RunContext, PurgeError> {
        let mut ctx = RunContext::new(dir, options);
        let projects = Self::discover_projects(&ctx.project_dir)?;
        Self::load_indices(&mut ctx)?;

        DefinitionCatalog::load_symbol_libraries(&mut ctx);

        let include_pcb = ctx.options.include_pcb;
        let mut collector = ReferenceCollector::new(&mut ctx);
        for project in &projects {
            match project.format_version() {
                Some(version) => tracing::info!("*** Processing project {} (format {})", project.name(), version),
                None => tracing::info!("*** Processing project {}", project.name()),
            }
            collector.walk(&project.root_schematic())?;
            if include_pcb {
                collector.collect_board(&project.board());
            }
        }

        DefinitionCatalog::reference_base_symbols(&mut ctx);
        DefinitionCatalog::scan_footprint_libraries(&mut ctx);
        Ok(ctx)
    }

    /// Run every phase and classify the result.
    pub fn run(dir: &Path, options: PurgeOptions) -> Result<PurgeReport, PurgeError> {
        let ctx = Self::collect(dir, options)?;
        Ok(PurgeReport::from_context(&ctx))
    }

    fn load_indices(ctx: &mut RunContext) -> Result<(), PurgeError> {
        // footprint namespaces first: symbol libraries reference footprints
        ctx.footprint_libraries = LibraryIndex::load(&ctx.project_dir, &ctx.options, LibraryKind::Footprint)?;
        ctx.symbol_libraries = LibraryIndex::load(&ctx.project_dir, &ctx.options, LibraryKind::Symbol)?;
        Ok(())
    }

    fn discover_projects(dir: &Path) -> Result<Vec<ProjectFile>, PurgeError> {
        if !dir.is_dir() {
            return Err(PurgeError::ProjectFileNotFound(dir.to_path_buf()));
        }
        let projects: Vec<ProjectFile> = ProjectFile::discover(dir)?
            .iter()
            .map(|path| ProjectFile::load(path))
            .collect();
        if projects.is_empty() {
            return Err(PurgeError::ProjectFileNotFound(dir.to_path_buf()));
        }
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(PurgeError::CyclicHierarchy { cycle: vec![] }.is_fatal());
        assert!(PurgeError::RootSchematicNotFound(PathBuf::from("x.kicad_sch")).is_fatal());
        assert!(!PurgeError::MalformedIdentity { raw: "x".into() }.is_fatal());
        assert!(!PurgeError::UnresolvableLibraryPath {
            name: "Device".into(),
            uri: "${KICAD8_SYMBOL_DIR}/Device.kicad_sym".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_cycle_display() {
        let err = PurgeError::CyclicHierarchy {
            cycle: vec![PathBuf::from("a.kicad_sch"), PathBuf::from("b.kicad_sch"), PathBuf::from("a.kicad_sch")],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic sheet hierarchy: a.kicad_sch -> b.kicad_sch -> a.kicad_sch"
        );
    }

    #[test]
    fn test_default_options() {
        let options = PurgeOptions::default();
        assert_eq!(options.project_root_token, "${KIPRJMOD}/");
        assert_eq!(options.library_type, "KiCad");
        assert!(options.include_pcb);
    }

    #[test]
    fn test_missing_project_dir() {
        let result = KiPurgeCore::run(Path::new("does/not/exist"), PurgeOptions::default());
        assert!(matches!(result, Err(PurgeError::ProjectFileNotFound(_))));
    }
}
