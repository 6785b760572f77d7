use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kipurge::parser::SymbolLibraryFile;
use kipurge::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bench_run_project(c: &mut Criterion) {
    c.bench_function("run_project", |b| {
        b.iter(|| KiPurgeCore::run(black_box(&fixture_path("demo")), black_box(PurgeOptions::default())));
    });
}

fn bench_parse_symbol_library(c: &mut Criterion) {
    let path = fixture_path("demo").join("LIBA.kicad_sym");
    c.bench_function("parse_symbol_library", |b| {
        b.iter(|| SymbolLibraryFile::parse_file(black_box(&path)));
    });
}

criterion_group!(benches, bench_run_project, bench_parse_symbol_library);
criterion_main!(benches);
