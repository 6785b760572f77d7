//! Reference/definition bookkeeping and the purge classification.
//!
//! Every symbol or footprint identity seen during a run gets one
//! [`Purgable`]. An entry only comes into existence through
//! [`Ledger::add_reference`] or [`Ledger::add_definition`], so it is always
//! referenced, defined, or both.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::identity::QualifiedId;
use crate::library::LibraryKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Defined but never used: the implementation can be deleted.
    PurgeCandidate,
    InUse,
    /// Used, but no defining file was found.
    MissingImplementation,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::PurgeCandidate => "purge candidate",
            Classification::InUse => "in use",
            Classification::MissingImplementation => "missing implementation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Purgable {
    id: QualifiedId,
    implementation: Option<PathBuf>,
    referenced: bool,
    reference_count: usize,
    referenced_from: BTreeSet<PathBuf>,
}

impl Purgable {
    fn new(id: QualifiedId) -> Self {
        Self {
            id,
            implementation: None,
            referenced: false,
            reference_count: 0,
            referenced_from: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &QualifiedId {
        &self.id
    }

    /// File defining this identity, if one was found.
    pub fn implementation(&self) -> Option<&Path> {
        self.implementation.as_deref()
    }

    pub fn is_referenced(&self) -> bool {
        self.referenced
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    /// Files in which a reference was observed.
    pub fn referenced_from(&self) -> impl Iterator<Item = &Path> {
        self.referenced_from.iter().map(PathBuf::as_path)
    }

    /// Depends only on whether the entry was referenced at least once and
    /// defined at least once.
    pub fn classification(&self) -> Classification {
        match (self.referenced, self.implementation.is_some()) {
            (false, _) => Classification::PurgeCandidate,
            (true, true) => Classification::InUse,
            (true, false) => Classification::MissingImplementation,
        }
    }
}

/// All identities of one kind seen during a run.
#[derive(Debug, Clone)]
pub struct Ledger {
    kind: LibraryKind,
    entries: HashMap<QualifiedId, Purgable>,
}

impl Ledger {
    pub fn new(kind: LibraryKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    /// Record a usage of `id` observed in `site`.
    pub fn add_reference(&mut self, id: QualifiedId, site: &Path) {
        tracing::debug!("{} {} referenced in {}", self.kind, id, site.display());
        let purgable = self.entries.entry(id.clone()).or_insert_with(|| Purgable::new(id));
        purgable.referenced = true;
        purgable.reference_count += 1;
        purgable.referenced_from.insert(site.to_path_buf());
    }

    /// Record that `location` implements `id`. A second definition replaces
    /// the first and is logged.
    pub fn add_definition(&mut self, id: QualifiedId, location: PathBuf) {
        tracing::debug!("{} {} defined in {}", self.kind, id, location.display());
        let purgable = self.entries.entry(id.clone()).or_insert_with(|| Purgable::new(id));
        if let Some(previous) = &purgable.implementation {
            tracing::warn!(
                "{} '{}' defined in '{}': overwritten by '{}'",
                self.kind,
                purgable.id,
                previous.display(),
                location.display()
            );
        }
        purgable.implementation = Some(location);
    }

    pub fn get(&self, id: &QualifiedId) -> Option<&Purgable> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in report order (case-insensitive by identity).
    pub fn sorted(&self) -> Vec<&Purgable> {
        let mut entries: Vec<&Purgable> = self.entries.values().collect();
        entries.sort_by(|a, b| a.id.report_cmp(&b.id));
        entries
    }

    /// Entries with the given classification, in report order.
    pub fn classified(&self, classification: Classification) -> Vec<&Purgable> {
        self.sorted()
            .into_iter()
            .filter(|p| p.classification() == classification)
            .collect()
    }
}
