//! Usage collection: the schematic sheet hierarchy and the board.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::context::RunContext;
use crate::core::{warn_recovered, PurgeError};
use crate::library::LibraryKind;
use crate::parser::pcb::PcbFile;
use crate::parser::schematic::SchematicFile;

/// Schematic files visited during a run and the sheet instances linking
/// them. Nodes are project-relative paths, edge weights are sheet names.
#[derive(Debug, Default)]
pub struct SheetHierarchy {
    graph: DiGraph<PathBuf, String>,
    nodes: HashMap<PathBuf, NodeIndex>,
}

impl SheetHierarchy {
    pub fn add_sheet(&mut self, file: &Path) -> NodeIndex {
        if let Some(&index) = self.nodes.get(file) {
            return index;
        }
        let index = self.graph.add_node(file.to_path_buf());
        self.nodes.insert(file.to_path_buf(), index);
        index
    }

    pub fn add_link(&mut self, parent: &Path, child: &Path, sheet_name: &str) {
        let parent = self.add_sheet(parent);
        let child = self.add_sheet(child);
        self.graph.add_edge(parent, child, sheet_name.to_string());
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Visited files in visiting order.
    pub fn sheets(&self) -> impl Iterator<Item = &Path> {
        self.graph.node_weights().map(PathBuf::as_path)
    }

    /// Names of the sheet instances that include `file`. Empty for a root.
    pub fn instance_names(&self, file: &Path) -> Vec<&str> {
        let Some(&index) = self.nodes.get(file) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| edge.weight().as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Files directly included by `file`.
    pub fn children(&self, file: &Path) -> Vec<&Path> {
        let Some(&index) = self.nodes.get(file) else {
            return Vec::new();
        };
        let mut children: Vec<&Path> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .map(|child| self.graph[child].as_path())
            .collect();
        children.sort();
        children.dedup();
        children
    }
}

/// Depth-first walk over a design's sheets, recording every symbol and
/// footprint usage into the run's ledgers.
///
/// `stack` holds the chain of sheets from the root to the sheet being read;
/// reaching a sheet already on it is a cycle. A sheet reached again from a
/// different branch is legal and is not read a second time.
pub struct ReferenceCollector<'a> {
    ctx: &'a mut RunContext,
    stack: Vec<PathBuf>,
    completed: HashSet<PathBuf>,
}

impl<'a> ReferenceCollector<'a> {
    pub fn new(ctx: &'a mut RunContext) -> Self {
        Self {
            ctx,
            stack: Vec::new(),
            completed: HashSet::new(),
        }
    }

    /// Walk the hierarchy below `root`. The root must exist and parse.
    pub fn walk(&mut self, root: &Path) -> Result<(), PurgeError> {
        if !root.is_file() {
            return Err(PurgeError::RootSchematicNotFound(root.to_path_buf()));
        }
        let root = normalize(root);
        self.visit(&root, true)
    }

    fn visit(&mut self, path: &Path, is_root: bool) -> Result<(), PurgeError> {
        let relative = self.ctx.relative(path);

        if let Some(start) = self.stack.iter().position(|ancestor| ancestor == path) {
            let mut cycle: Vec<PathBuf> = self.stack[start..].iter().map(|p| self.ctx.relative(p)).collect();
            cycle.push(relative);
            return Err(PurgeError::CyclicHierarchy { cycle });
        }
        if self.completed.contains(path) {
            tracing::debug!("{} already processed", relative.display());
            return Ok(());
        }

        let schematic = match SchematicFile::parse_file(path) {
            Ok(schematic) => schematic,
            Err(e) => {
                let err = PurgeError::Parse {
                    path: relative,
                    message: e.to_string(),
                };
                if is_root {
                    return Err(err);
                }
                warn_recovered(err);
                return Ok(());
            }
        };

        tracing::info!("*** Processing {}", relative.display());
        self.ctx.hierarchy.add_sheet(&relative);
        self.record_symbols(&schematic);

        self.stack.push(path.to_path_buf());
        for sheet in &schematic.sheets {
            tracing::debug!("  SHEET {} - {}", sheet.name, sheet.filename);
            let child = self.ctx.project_dir.join(&sheet.filename);
            if !child.is_file() {
                warn_recovered(PurgeError::SheetFileMissing {
                    sheet: sheet.name.clone(),
                    path: self.ctx.relative(&child),
                });
                continue;
            }
            let child = normalize(&child);
            let child_relative = self.ctx.relative(&child);
            self.ctx.hierarchy.add_link(&relative, &child_relative, &sheet.name);
            self.visit(&child, false)?;
        }
        self.stack.pop();

        self.completed.insert(path.to_path_buf());
        Ok(())
    }

    fn record_symbols(&mut self, schematic: &SchematicFile) {
        for symbol in &schematic.symbols {
            match symbol.lib_id.as_deref() {
                Some(lib_id) => self.record(LibraryKind::Symbol, lib_id, &schematic.path),
                None => tracing::warn!(
                    "{}: symbol instance {} without lib_id",
                    self.ctx.relative(&schematic.path).display(),
                    symbol.reference.as_deref().unwrap_or("?")
                ),
            }
            if let Some(footprint) = symbol.footprint.as_deref() {
                self.record(LibraryKind::Footprint, footprint, &schematic.path);
            }
        }
    }

    fn record(&mut self, kind: LibraryKind, raw: &str, site: &Path) {
        if let Err(e) = self.ctx.record_reference(kind, raw, site) {
            tracing::warn!("{}: {}", self.ctx.relative(site).display(), e);
        }
    }

    /// Record every footprint placed on the board at `path`. A missing
    /// board is not an error; a board that does not parse is skipped.
    pub fn collect_board(&mut self, path: &Path) {
        if !path.is_file() {
            tracing::info!("{}: no board file", self.ctx.relative(path).display());
            return;
        }
        let path = normalize(path);
        let path = path.as_path();

        let board = match PcbFile::parse_file(path) {
            Ok(board) => board,
            Err(e) => {
                warn_recovered(PurgeError::Parse {
                    path: self.ctx.relative(path),
                    message: e.to_string(),
                });
                return;
            }
        };

        tracing::info!("*** Processing {}", self.ctx.relative(path).display());
        for footprint in &board.footprints {
            tracing::debug!("  FOOTPRINT {} - {}", footprint.reference.as_deref().unwrap_or("?"), footprint.lib_id);
            self.record(LibraryKind::Footprint, &footprint.lib_id, &board.path);
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PurgeOptions;
    use crate::identity::QualifiedId;
    use tempfile::TempDir;

    fn sheet(name: &str, file: &str) -> String {
        format!(
            r#"(sheet (at 0 0) (property "Sheetname" "{name}") (property "Sheetfile" "{file}"))"#
        )
    }

    fn instance(lib_id: &str, footprint: &str) -> String {
        format!(r#"(symbol (lib_id "{lib_id}") (property "Footprint" "{footprint}"))"#)
    }

    fn write_sheet(dir: &Path, file: &str, body: &[String]) {
        std::fs::write(dir.join(file), format!("(kicad_sch (version 20231120)\n{}\n)", body.join("\n"))).unwrap();
    }

    fn context(dir: &Path) -> RunContext {
        let mut ctx = RunContext::new(dir, PurgeOptions::default());
        let sym = ctx.project_dir.join("LIBA.kicad_sym");
        let fp = ctx.project_dir.join("LIBB.pretty");
        ctx.symbol_libraries.add("LIBA", sym);
        ctx.footprint_libraries.add("LIBB", fp);
        ctx
    }

    #[test]
    fn test_walk_records_symbols_and_footprints() {
        let dir = TempDir::new().unwrap();
        write_sheet(
            dir.path(),
            "root.kicad_sch",
            &[instance("LIBA:Foo", "LIBB:X"), instance("Device:R", "LIBB:Y"), sheet("sub", "sub.kicad_sch")],
        );
        write_sheet(dir.path(), "sub.kicad_sch", &[instance("LIBA:Bar", "")]);

        let mut ctx = context(dir.path());
        let root = ctx.project_dir.join("root.kicad_sch");
        ReferenceCollector::new(&mut ctx).walk(&root).unwrap();

        let symbols: Vec<String> = ctx.symbols.sorted().iter().map(|p| p.id().to_string()).collect();
        assert_eq!(symbols, vec!["LIBA:Bar", "LIBA:Foo"]);
        let footprints: Vec<String> = ctx.footprints.sorted().iter().map(|p| p.id().to_string()).collect();
        assert_eq!(footprints, vec!["LIBB:X", "LIBB:Y"]);
        assert_eq!(ctx.hierarchy.len(), 2);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_sheet(dir.path(), "a.kicad_sch", &[sheet("b", "b.kicad_sch")]);
        write_sheet(dir.path(), "b.kicad_sch", &[sheet("a", "a.kicad_sch")]);

        let mut ctx = context(dir.path());
        let root = ctx.project_dir.join("a.kicad_sch");
        let err = ReferenceCollector::new(&mut ctx).walk(&root).unwrap_err();

        match &err {
            PurgeError::CyclicHierarchy { cycle } => assert_eq!(
                cycle,
                &vec![
                    PathBuf::from("a.kicad_sch"),
                    PathBuf::from("b.kicad_sch"),
                    PathBuf::from("a.kicad_sch")
                ]
            ),
            other => panic!("expected a cycle, got {other:?}"),
        }
        assert!(err.is_fatal());
        assert!(err.to_string().contains("a.kicad_sch -> b.kicad_sch -> a.kicad_sch"));
    }

    #[test]
    fn test_self_inclusion_is_a_cycle() {
        let dir = TempDir::new().unwrap();
        write_sheet(dir.path(), "a.kicad_sch", &[sheet("me", "a.kicad_sch")]);

        let mut ctx = context(dir.path());
        let root = ctx.project_dir.join("a.kicad_sch");
        let result = ReferenceCollector::new(&mut ctx).walk(&root);
        assert!(matches!(result, Err(PurgeError::CyclicHierarchy { .. })));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        write_sheet(
            dir.path(),
            "root.kicad_sch",
            &[sheet("left", "left.kicad_sch"), sheet("right", "right.kicad_sch")],
        );
        write_sheet(dir.path(), "left.kicad_sch", &[sheet("shared_l", "shared.kicad_sch")]);
        write_sheet(dir.path(), "right.kicad_sch", &[sheet("shared_r", "shared.kicad_sch")]);
        write_sheet(dir.path(), "shared.kicad_sch", &[instance("LIBA:Foo", "LIBB:X")]);

        let mut ctx = context(dir.path());
        let root = ctx.project_dir.join("root.kicad_sch");
        ReferenceCollector::new(&mut ctx).walk(&root).unwrap();

        assert_eq!(ctx.hierarchy.len(), 4);
        assert_eq!(
            ctx.hierarchy.instance_names(Path::new("shared.kicad_sch")),
            vec!["shared_l", "shared_r"]
        );
        let foo = ctx.symbols.get(&QualifiedId::parse("LIBA:Foo").unwrap()).unwrap();
        assert!(foo.is_referenced());
    }

    #[test]
    fn test_missing_sub_sheet_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_sheet(
            dir.path(),
            "root.kicad_sch",
            &[sheet("gone", "gone.kicad_sch"), instance("LIBA:Foo", "")],
        );

        let mut ctx = context(dir.path());
        let root = ctx.project_dir.join("root.kicad_sch");
        ReferenceCollector::new(&mut ctx).walk(&root).unwrap();
        assert_eq!(ctx.symbols.len(), 1);
        assert!(ctx.hierarchy.children(Path::new("root.kicad_sch")).is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path());
        let root = ctx.project_dir.join("nope.kicad_sch");
        let err = ReferenceCollector::new(&mut ctx).walk(&root).unwrap_err();
        assert!(matches!(err, PurgeError::RootSchematicNotFound(_)));
    }

    #[test]
    fn test_board_footprints_are_references() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("board.kicad_pcb"),
            r#"(kicad_pcb (footprint "LIBB:X" (layer "F.Cu")) (footprint "Resistor_SMD:R_0603" (layer "F.Cu")))"#,
        )
        .unwrap();

        let mut ctx = context(dir.path());
        let board = ctx.project_dir.join("board.kicad_pcb");
        ReferenceCollector::new(&mut ctx).collect_board(&board);

        assert_eq!(ctx.footprints.len(), 1);
        let x = ctx.footprints.get(&QualifiedId::parse("LIBB:X").unwrap()).unwrap();
        assert!(x.is_referenced());
        assert!(x.implementation().is_none());
    }
}
