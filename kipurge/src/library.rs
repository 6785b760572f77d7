//! Library namespaces resolved from the project's library tables.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{warn_recovered, PurgeError, PurgeOptions};
use crate::identity::LIBRARY_DELIMITER;
use crate::parser::lib_table::{LibTable, LibTableEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    Symbol,
    Footprint,
}

impl LibraryKind {
    pub fn table_root_tag(self) -> &'static str {
        match self {
            LibraryKind::Symbol => "sym_lib_table",
            LibraryKind::Footprint => "fp_lib_table",
        }
    }

    /// Table file name configured for this kind.
    pub fn table_file(self, options: &PurgeOptions) -> &str {
        match self {
            LibraryKind::Symbol => &options.symbol_table,
            LibraryKind::Footprint => &options.footprint_table,
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Symbol => write!(f, "symbol"),
            LibraryKind::Footprint => write!(f, "footprint"),
        }
    }
}

/// Where a namespace lives on disk: a `.kicad_sym` file for symbols, a
/// `.pretty` directory for footprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLocation {
    pub path: PathBuf,
    pub exists: bool,
}

/// Namespace name to location, for one library kind.
///
/// Namespaces whose location is missing stay in the index so identities
/// using them still match; they just contribute no definitions.
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    kind: LibraryKind,
    libraries: BTreeMap<String, LibraryLocation>,
}

impl LibraryIndex {
    pub fn new(kind: LibraryKind) -> Self {
        Self {
            kind,
            libraries: BTreeMap::new(),
        }
    }

    /// Read the kind's library table from `project_dir`.
    ///
    /// A missing table gives an empty index. A table that does not parse
    /// aborts the run.
    pub fn load(project_dir: &Path, options: &PurgeOptions, kind: LibraryKind) -> Result<Self, PurgeError> {
        let mut index = Self::new(kind);
        let path = project_dir.join(kind.table_file(options));
        if !path.is_file() {
            tracing::warn!("{}: no {} library table, no project {} libraries", path.display(), kind, kind);
            return Ok(index);
        }

        tracing::info!("*** Processing {}", kind.table_file(options));
        let table = LibTable::parse_file(&path, kind).map_err(|e| PurgeError::MalformedLibraryTable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        for entry in &table.entries {
            if let Err(e) = index.add_entry(entry, project_dir, options) {
                warn_recovered(e);
            }
        }
        Ok(index)
    }

    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    /// Bind one table entry. Entries of a foreign library type are ignored
    /// (`Ok(false)`); entries whose uri is not rooted at the project are
    /// rejected.
    pub fn add_entry(
        &mut self,
        entry: &LibTableEntry,
        project_dir: &Path,
        options: &PurgeOptions,
    ) -> Result<bool, PurgeError> {
        if entry.lib_type != options.library_type {
            tracing::debug!("{} library '{}' has type '{}', ignored", self.kind, entry.name, entry.lib_type);
            return Ok(false);
        }

        let relative = entry
            .uri
            .strip_prefix(options.project_root_token.as_str())
            .ok_or_else(|| PurgeError::UnresolvableLibraryPath {
                name: entry.name.clone(),
                uri: entry.uri.clone(),
            })?;

        self.add(&entry.name, project_dir.join(relative));
        Ok(true)
    }

    /// Bind `name` to `path`, warning when nothing exists there.
    pub fn add(&mut self, name: &str, path: PathBuf) -> &LibraryLocation {
        let exists = match self.kind {
            LibraryKind::Symbol => path.is_file(),
            LibraryKind::Footprint => path.is_dir(),
        };
        if !exists {
            let missing = match self.kind {
                LibraryKind::Symbol => PurgeError::LibraryFileMissing {
                    name: name.to_string(),
                    path: path.clone(),
                },
                LibraryKind::Footprint => PurgeError::DirectoryMissing {
                    name: name.to_string(),
                    path: path.clone(),
                },
            };
            warn_recovered(missing);
        }

        tracing::debug!("{} library {} -> {}", self.kind, name, path.display());
        if self.libraries.contains_key(name) {
            tracing::warn!("{} library '{}' listed twice, keeping {}", self.kind, name, path.display());
        }
        self.libraries.insert(name.to_string(), LibraryLocation { path, exists });
        &self.libraries[name]
    }

    /// True when `qualified` starts with `<namespace>:` for any known
    /// namespace. This is a literal prefix test over every namespace.
    pub fn is_namespace_of(&self, qualified: &str) -> bool {
        self.libraries.keys().any(|namespace| {
            qualified
                .strip_prefix(namespace.as_str())
                .is_some_and(|rest| rest.starts_with(LIBRARY_DELIMITER))
        })
    }

    pub fn get(&self, name: &str) -> Option<&LibraryLocation> {
        self.libraries.get(name)
    }

    /// Namespaces in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LibraryLocation)> {
        self.libraries.iter().map(|(name, location)| (name.as_str(), location))
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str, lib_type: &str, uri: &str) -> LibTableEntry {
        LibTableEntry {
            name: name.to_string(),
            lib_type: lib_type.to_string(),
            uri: uri.to_string(),
            options: String::new(),
            descr: String::new(),
        }
    }

    #[test]
    fn test_project_rooted_entry_is_bound() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("LIBB.pretty")).unwrap();
        let options = PurgeOptions::default();
        let mut index = LibraryIndex::new(LibraryKind::Footprint);

        let bound = index
            .add_entry(&entry("LIBB", "KiCad", "${KIPRJMOD}/LIBB.pretty"), dir.path(), &options)
            .unwrap();
        assert!(bound);

        let location = index.get("LIBB").unwrap();
        assert_eq!(location.path, dir.path().join("LIBB.pretty"));
        assert!(location.exists);
    }

    #[test]
    fn test_missing_directory_is_kept_and_flagged() {
        let dir = TempDir::new().unwrap();
        let options = PurgeOptions::default();
        let mut index = LibraryIndex::new(LibraryKind::Footprint);

        index
            .add_entry(&entry("Gone", "KiCad", "${KIPRJMOD}/Gone.pretty"), dir.path(), &options)
            .unwrap();
        assert!(!index.get("Gone").unwrap().exists);
        assert!(index.is_namespace_of("Gone:Anything"));
    }

    #[test]
    fn test_foreign_type_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut index = LibraryIndex::new(LibraryKind::Footprint);
        let bound = index
            .add_entry(&entry("Old", "Legacy", "${KIPRJMOD}/Old.mod"), dir.path(), &PurgeOptions::default())
            .unwrap();
        assert!(!bound);
        assert!(index.is_empty());
    }

    #[test]
    fn test_unrooted_uri_is_unresolvable() {
        let dir = TempDir::new().unwrap();
        let mut index = LibraryIndex::new(LibraryKind::Symbol);
        let err = index
            .add_entry(&entry("Device", "KiCad", "${KICAD8_SYMBOL_DIR}/Device.kicad_sym"), dir.path(), &PurgeOptions::default())
            .unwrap_err();
        assert!(matches!(err, PurgeError::UnresolvableLibraryPath { .. }));
        assert!(!index.is_namespace_of("Device:R"));
    }

    #[test]
    fn test_namespace_prefix_semantics() {
        let mut index = LibraryIndex::new(LibraryKind::Symbol);
        index.add("00_project_library", PathBuf::from("/nowhere/a.kicad_sym"));
        index.add("LIB", PathBuf::from("/nowhere/b.kicad_sym"));

        assert!(index.is_namespace_of("00_project_library:TPS259474LRPWR"));
        assert!(index.is_namespace_of("LIB:R"));
        assert!(!index.is_namespace_of("LIBX:R"), "namespace must be followed by the delimiter");
        assert!(!index.is_namespace_of("lib:R"), "matching is case-sensitive");
        assert!(!index.is_namespace_of("LIB"));
        assert!(!index.is_namespace_of("R"));
    }

    #[test]
    fn test_load_missing_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = LibraryIndex::load(dir.path(), &PurgeOptions::default(), LibraryKind::Symbol).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_malformed_table_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sym-lib-table"), "(sym_lib_table (lib (name \"A\")").unwrap();
        let err = LibraryIndex::load(dir.path(), &PurgeOptions::default(), LibraryKind::Symbol).unwrap_err();
        assert!(matches!(err, PurgeError::MalformedLibraryTable { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_table() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("LIBA.kicad_sym"), "(kicad_symbol_lib)").unwrap();
        std::fs::write(
            dir.path().join("sym-lib-table"),
            r#"(sym_lib_table (version 7)
  (lib (name "LIBA")(type "KiCad")(uri "${KIPRJMOD}/LIBA.kicad_sym")(options "")(descr ""))
  (lib (name "Device")(type "KiCad")(uri "${KICAD8_SYMBOL_DIR}/Device.kicad_sym")(options "")(descr ""))
)"#,
        )
        .unwrap();

        let index = LibraryIndex::load(dir.path(), &PurgeOptions::default(), LibraryKind::Symbol).unwrap();
        let names: Vec<_> = index.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["LIBA"]);
        assert!(index.get("LIBA").unwrap().exists);
    }
}
