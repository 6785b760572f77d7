//! Definitions provided by the project libraries.
//!
//! Symbol libraries are single `.kicad_sym` files listing every symbol.
//! Footprint libraries are `.pretty` directories holding one file per
//! footprint, so their definitions come from a directory listing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::context::RunContext;
use crate::core::{warn_recovered, PurgeError};
use crate::identity::{QualifiedId, LIBRARY_DELIMITER};
use crate::library::LibraryKind;
use crate::parser::symbol_lib::SymbolLibraryFile;

pub struct DefinitionCatalog;

impl DefinitionCatalog {
    /// Define every symbol of every existing symbol library. A symbol's
    /// default footprint counts as a reference to that footprint.
    pub fn load_symbol_libraries(ctx: &mut RunContext) {
        let libraries: Vec<(String, PathBuf)> = ctx
            .symbol_libraries
            .iter()
            .filter(|(_, location)| location.exists)
            .map(|(name, location)| (name.to_string(), location.path.clone()))
            .collect();

        for (namespace, path) in libraries {
            tracing::info!("*** Processing {}", ctx.relative(&path).display());
            match SymbolLibraryFile::parse_file(&path) {
                Ok(library) => Self::add_symbol_library(ctx, &namespace, &library),
                Err(e) => warn_recovered(PurgeError::Parse {
                    path: ctx.relative(&path),
                    message: e.to_string(),
                }),
            }
        }
    }

    fn add_symbol_library(ctx: &mut RunContext, namespace: &str, library: &SymbolLibraryFile) {
        let location = ctx.relative(&library.path);
        for symbol in &library.symbols {
            let id = match QualifiedId::new(namespace, symbol.name.as_str()) {
                Ok(id) => id,
                Err(e) => {
                    warn_recovered(e);
                    continue;
                }
            };
            // (extends "Base") always names a symbol of the same library
            if let Some(base) = symbol.extends.as_deref() {
                match QualifiedId::new(namespace, base) {
                    Ok(base) => {
                        ctx.symbol_bases.insert(id.clone(), (base, location.clone()));
                    }
                    Err(e) => warn_recovered(e),
                }
            }
            ctx.symbols.add_definition(id, location.clone());

            let Some(footprint) = symbol.footprint.as_deref() else {
                continue;
            };
            if !footprint.contains(LIBRARY_DELIMITER) {
                continue;
            }
            if let Err(e) = ctx.record_reference(LibraryKind::Footprint, footprint, &library.path) {
                warn_recovered(e);
            }
        }
    }

    /// Mark the base of every referenced derived symbol as referenced, from
    /// the library file declaring the derivation. Follows chains of
    /// derivations.
    pub fn reference_base_symbols(ctx: &mut RunContext) {
        let mut pending: Vec<QualifiedId> = ctx
            .symbol_bases
            .keys()
            .filter(|derived| ctx.symbols.get(derived).is_some_and(|p| p.is_referenced()))
            .cloned()
            .collect();
        pending.sort_by(QualifiedId::report_cmp);

        let mut done = HashSet::new();
        while let Some(derived) = pending.pop() {
            if !done.insert(derived.clone()) {
                continue;
            }
            let Some((base, site)) = ctx.symbol_bases.get(&derived).cloned() else {
                continue;
            };
            tracing::debug!("symbol {} derives from {}", derived, base);
            ctx.symbols.add_reference(base.clone(), &site);
            pending.push(base);
        }
    }

    /// Define one footprint per file in every existing footprint library
    /// directory.
    pub fn scan_footprint_libraries(ctx: &mut RunContext) {
        let libraries: Vec<(String, PathBuf)> = ctx
            .footprint_libraries
            .iter()
            .filter(|(_, location)| location.exists)
            .map(|(name, location)| (name.to_string(), location.path.clone()))
            .collect();

        for (namespace, dir) in libraries {
            tracing::info!("*** Processing {}", ctx.relative(&dir).display());
            let files = match Self::footprint_files(&dir, &ctx.options.footprint_extension) {
                Ok(files) => files,
                Err(e) => {
                    warn_recovered(PurgeError::Io(e));
                    continue;
                }
            };

            for file in files {
                let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                    tracing::warn!("{}: footprint file name is not UTF-8", file.display());
                    continue;
                };
                match QualifiedId::new(namespace.as_str(), stem) {
                    Ok(id) => {
                        let location = ctx.relative(&file);
                        ctx.footprints.add_definition(id, location);
                    }
                    Err(e) => warn_recovered(e),
                }
            }
        }
    }

    /// Footprint files directly inside `dir`, sorted by name.
    fn footprint_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
