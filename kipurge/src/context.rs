//! State owned by a single purge run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::collector::SheetHierarchy;
use crate::core::{PurgeError, PurgeOptions};
use crate::identity::QualifiedId;
use crate::ledger::Ledger;
use crate::library::{LibraryIndex, LibraryKind};

/// Everything a run accumulates. Created once per run and passed by
/// reference to each phase.
#[derive(Debug)]
pub struct RunContext {
    pub project_dir: PathBuf,
    pub options: PurgeOptions,
    pub symbol_libraries: LibraryIndex,
    pub footprint_libraries: LibraryIndex,
    pub symbols: Ledger,
    pub footprints: Ledger,
    /// Derived symbol -> (base symbol, library file declaring the derivation).
    pub symbol_bases: HashMap<QualifiedId, (QualifiedId, PathBuf)>,
    pub hierarchy: SheetHierarchy,
}

impl RunContext {
    pub fn new(project_dir: &Path, options: PurgeOptions) -> Self {
        let project_dir = project_dir
            .canonicalize()
            .unwrap_or_else(|_| project_dir.to_path_buf());
        Self {
            project_dir,
            options,
            symbol_libraries: LibraryIndex::new(LibraryKind::Symbol),
            footprint_libraries: LibraryIndex::new(LibraryKind::Footprint),
            symbols: Ledger::new(LibraryKind::Symbol),
            footprints: Ledger::new(LibraryKind::Footprint),
            symbol_bases: HashMap::new(),
            hierarchy: SheetHierarchy::default(),
        }
    }

    pub fn libraries(&self, kind: LibraryKind) -> &LibraryIndex {
        match kind {
            LibraryKind::Symbol => &self.symbol_libraries,
            LibraryKind::Footprint => &self.footprint_libraries,
        }
    }

    pub fn ledger(&self, kind: LibraryKind) -> &Ledger {
        match kind {
            LibraryKind::Symbol => &self.symbols,
            LibraryKind::Footprint => &self.footprints,
        }
    }

    /// `path` relative to the project directory, or unchanged when it lies
    /// outside of it.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.project_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Record `raw` as referenced from `site` when it belongs to a known
    /// namespace of `kind`.
    ///
    /// Returns `Ok(false)` for identities outside the project libraries and
    /// `MalformedIdentity` for strings without a library part.
    pub fn record_reference(&mut self, kind: LibraryKind, raw: &str, site: &Path) -> Result<bool, PurgeError> {
        let id = QualifiedId::parse(raw)?;
        if !self.libraries(kind).is_namespace_of(raw) {
            tracing::debug!("{} {} is not in a project library", kind, raw);
            return Ok(false);
        }

        let site = self.relative(site);
        let ledger = match kind {
            LibraryKind::Symbol => &mut self.symbols,
            LibraryKind::Footprint => &mut self.footprints,
        };
        ledger.add_reference(id, &site);
        Ok(true)
    }
}
