//! Classification report built from a finished run.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::RunContext;
use crate::identity::QualifiedId;
use crate::ledger::{Classification, Ledger, Purgable};
use crate::library::{LibraryIndex, LibraryKind};

/// One ledger entry with its verdict. Paths are relative to the project.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedEntry {
    pub id: QualifiedId,
    pub library: String,
    pub name: String,
    pub classification: Classification,
    pub implementation: Option<PathBuf>,
    pub reference_count: usize,
    pub referenced_from: Vec<PathBuf>,
}

impl From<&Purgable> for ClassifiedEntry {
    fn from(purgable: &Purgable) -> Self {
        Self {
            id: purgable.id().clone(),
            library: purgable.id().library().to_string(),
            name: purgable.id().name().to_string(),
            classification: purgable.classification(),
            implementation: purgable.implementation().map(Path::to_path_buf),
            reference_count: purgable.reference_count(),
            referenced_from: purgable.referenced_from().map(Path::to_path_buf).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub purge_candidates: usize,
    pub in_use: usize,
    pub missing_implementation: usize,
}

/// The three groups for one kind, each sorted case-insensitively.
#[derive(Debug, Clone, Serialize)]
pub struct KindReport {
    pub kind: LibraryKind,
    pub purge_candidates: Vec<ClassifiedEntry>,
    pub in_use: Vec<ClassifiedEntry>,
    pub missing_implementation: Vec<ClassifiedEntry>,
}

impl KindReport {
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let mut report = Self {
            kind: ledger.kind(),
            purge_candidates: Vec::new(),
            in_use: Vec::new(),
            missing_implementation: Vec::new(),
        };
        for purgable in ledger.sorted() {
            let entry = ClassifiedEntry::from(purgable);
            match entry.classification {
                Classification::PurgeCandidate => report.purge_candidates.push(entry),
                Classification::InUse => report.in_use.push(entry),
                Classification::MissingImplementation => report.missing_implementation.push(entry),
            }
        }
        report
    }

    pub fn entries(&self, classification: Classification) -> &[ClassifiedEntry] {
        match classification {
            Classification::PurgeCandidate => &self.purge_candidates,
            Classification::InUse => &self.in_use,
            Classification::MissingImplementation => &self.missing_implementation,
        }
    }

    pub fn find(&self, id: &str) -> Option<&ClassifiedEntry> {
        self.purge_candidates
            .iter()
            .chain(&self.in_use)
            .chain(&self.missing_implementation)
            .find(|entry| entry.id.to_string() == id)
    }

    pub fn classification_of(&self, id: &str) -> Option<Classification> {
        self.find(id).map(|entry| entry.classification)
    }

    pub fn stats(&self) -> KindStats {
        KindStats {
            purge_candidates: self.purge_candidates.len(),
            in_use: self.in_use.len(),
            missing_implementation: self.missing_implementation.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.purge_candidates.len() + self.in_use.len() + self.missing_implementation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn title(&self) -> &'static str {
        match self.kind {
            LibraryKind::Symbol => "Symbols",
            LibraryKind::Footprint => "Footprints",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryRecord {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetRecord {
    pub file: PathBuf,
    /// Sheet instances including this file; empty for a root schematic.
    pub instances: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportStats {
    pub symbols: KindStats,
    pub footprints: KindStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub project_dir: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub symbol_libraries: Vec<LibraryRecord>,
    pub footprint_libraries: Vec<LibraryRecord>,
    pub symbols: KindReport,
    pub footprints: KindReport,
    pub sheets: Vec<SheetRecord>,
    pub stats: ReportStats,
}

impl PurgeReport {
    pub fn from_context(ctx: &RunContext) -> Self {
        let symbols = KindReport::from_ledger(&ctx.symbols);
        let footprints = KindReport::from_ledger(&ctx.footprints);
        let sheets = ctx
            .hierarchy
            .sheets()
            .map(|file| SheetRecord {
                file: file.to_path_buf(),
                instances: ctx.hierarchy.instance_names(file).into_iter().map(str::to_string).collect(),
            })
            .collect();
        let stats = ReportStats {
            symbols: symbols.stats(),
            footprints: footprints.stats(),
        };

        Self {
            project_dir: ctx.project_dir.clone(),
            generated_at: Utc::now(),
            symbol_libraries: library_records(ctx, &ctx.symbol_libraries),
            footprint_libraries: library_records(ctx, &ctx.footprint_libraries),
            symbols,
            footprints,
            sheets,
            stats,
        }
    }

    pub fn kind(&self, kind: LibraryKind) -> &KindReport {
        match kind {
            LibraryKind::Symbol => &self.symbols,
            LibraryKind::Footprint => &self.footprints,
        }
    }

    pub fn has_purge_candidates(&self) -> bool {
        !self.symbols.purge_candidates.is_empty() || !self.footprints.purge_candidates.is_empty()
    }

    pub fn has_missing_implementations(&self) -> bool {
        !self.symbols.missing_implementation.is_empty() || !self.footprints.missing_implementation.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_human(&self) -> String {
        self.to_string()
    }

    /// Display adapter listing the resolved libraries only.
    pub fn libraries(&self) -> LibraryListing<'_> {
        LibraryListing(self)
    }

    /// Emit the report through `tracing`: purge candidates at info, missing
    /// implementations at warn, entries in use at debug.
    pub fn log(&self) {
        for kind in [&self.symbols, &self.footprints] {
            tracing::info!("**** {} to be purged", kind.title());
            for entry in &kind.purge_candidates {
                tracing::info!("   {} ({})", display_opt(entry.implementation.as_deref()), entry.id);
            }
            for entry in &kind.missing_implementation {
                tracing::warn!("   {} referenced but not implemented", entry.id);
            }
            for entry in &kind.in_use {
                tracing::debug!("   {} ({})", display_opt(entry.implementation.as_deref()), entry.id);
            }
        }
    }
}

fn library_records(ctx: &RunContext, index: &LibraryIndex) -> Vec<LibraryRecord> {
    index
        .iter()
        .map(|(name, location)| LibraryRecord {
            name: name.to_string(),
            path: ctx.relative(&location.path),
            exists: location.exists,
        })
        .collect()
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string())
}

fn write_group(f: &mut fmt::Formatter<'_>, title: &str, entries: &[ClassifiedEntry]) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(f, "\n  {} ({}):", title, entries.len())?;
    for entry in entries {
        match (&entry.implementation, entry.referenced_from.first()) {
            (Some(implementation), _) => writeln!(f, "    - {}  ({})", entry.id, implementation.display())?,
            (None, Some(site)) => writeln!(f, "    - {}  (referenced in {})", entry.id, site.display())?,
            (None, None) => writeln!(f, "    - {}", entry.id)?,
        }
    }
    Ok(())
}

impl fmt::Display for PurgeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project: {}", self.project_dir.display())?;
        writeln!(
            f,
            "Libraries: {} symbol, {} footprint; sheets: {}",
            self.symbol_libraries.len(),
            self.footprint_libraries.len(),
            self.sheets.len()
        )?;

        for kind in [&self.symbols, &self.footprints] {
            writeln!(f, "\n{}", kind.title())?;
            writeln!(f, "{}", "─".repeat(60))?;
            if kind.is_empty() {
                writeln!(f, "  Nothing found")?;
                continue;
            }
            write_group(f, "PURGE CANDIDATES", &kind.purge_candidates)?;
            write_group(f, "MISSING IMPLEMENTATION", &kind.missing_implementation)?;
            write_group(f, "IN USE", &kind.in_use)?;
        }

        writeln!(f, "\nSummary:")?;
        for (title, stats) in [("Symbols", self.stats.symbols), ("Footprints", self.stats.footprints)] {
            writeln!(
                f,
                "  {:<11} purge {}, in use {}, missing {}",
                format!("{}:", title),
                stats.purge_candidates,
                stats.in_use,
                stats.missing_implementation
            )?;
        }
        Ok(())
    }
}

pub struct LibraryListing<'a>(&'a PurgeReport);

impl fmt::Display for LibraryListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, records) in [
            ("Libraries footprint", &self.0.footprint_libraries),
            ("Libraries symbol", &self.0.symbol_libraries),
        ] {
            writeln!(f, "*** {}", title)?;
            for record in records {
                let marker = if record.exists { "" } else { "  (missing)" };
                writeln!(f, "      {}: {}{}", record.name, record.path.display(), marker)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PurgeOptions;

    fn id(raw: &str) -> QualifiedId {
        QualifiedId::parse(raw).unwrap()
    }

    fn context() -> RunContext {
        let mut ctx = RunContext::new(Path::new("/project"), PurgeOptions::default());
        ctx.symbols.add_definition(id("LIBA:Foo"), PathBuf::from("LIBA.kicad_sym"));
        ctx.symbols.add_definition(id("LIBA:unused"), PathBuf::from("LIBA.kicad_sym"));
        ctx.symbols.add_reference(id("LIBA:Foo"), Path::new("root.kicad_sch"));
        ctx.symbols.add_reference(id("LIBA:Bar"), Path::new("root.kicad_sch"));
        ctx.footprints.add_definition(id("LIBB:Y"), PathBuf::from("LIBB.pretty/Y.kicad_mod"));
        ctx
    }

    #[test]
    fn test_groups() {
        let report = PurgeReport::from_context(&context());
        assert_eq!(report.symbols.classification_of("LIBA:Foo"), Some(Classification::InUse));
        assert_eq!(
            report.symbols.classification_of("LIBA:Bar"),
            Some(Classification::MissingImplementation)
        );
        assert_eq!(
            report.symbols.classification_of("LIBA:unused"),
            Some(Classification::PurgeCandidate)
        );
        assert_eq!(report.footprints.stats().purge_candidates, 1);
        assert_eq!(report.symbols.find("LIBB:Y").map(|e| e.classification), None);
        assert!(report.has_purge_candidates());
        assert!(report.has_missing_implementations());
    }

    #[test]
    fn test_human_rendering() {
        let text = PurgeReport::from_context(&context()).render_human();
        assert!(text.contains("PURGE CANDIDATES (1):"));
        assert!(text.contains("- LIBA:unused  (LIBA.kicad_sym)"));
        assert!(text.contains("- LIBA:Bar  (referenced in root.kicad_sch)"));
        assert!(text.contains("- LIBB:Y  (LIBB.pretty/Y.kicad_mod)"));
    }

    #[test]
    fn test_json_shape() {
        let json = PurgeReport::from_context(&context()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["symbols"]["kind"], "symbol");
        assert_eq!(value["symbols"]["missing_implementation"][0]["id"], "LIBA:Bar");
        assert_eq!(value["symbols"]["missing_implementation"][0]["classification"], "missing_implementation");
        assert_eq!(value["stats"]["footprints"]["purge_candidates"], 1);
        assert!(value["generated_at"].is_string());
    }
}
