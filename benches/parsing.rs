//! Benchmarks for address and color parsing on the selection hot path.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::executor::block_on;
use xlpane::address::{intersects, normalize_for_comparison, parse_qualified_address};
use xlpane::cell_ref::CellRange;
use xlpane::color::normalize_hex_color;
use xlpane::store::dedupe_colors;
use xlpane::{MemoryHost, PaneConfig, PaneController, TriggerConfig};

fn bench_parse_address(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_qualified_address");
    for input in ["Sheet1!B2", "'Q1 ''Plan'''!$A$1:$D$40", "=Data!C:C", "B2"] {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| normalize_for_comparison(&parse_qualified_address(black_box(input))))
        });
    }
    group.finish();
}

fn bench_range_intersection(c: &mut Criterion) {
    let a = CellRange::parse("A1:Z1000").expect("range");
    let b = CellRange::parse("M500:AZ2000").expect("range");
    c.bench_function("cell_range_intersection", |bench| {
        bench.iter(|| black_box(&a).intersection(black_box(&b)))
    });
    c.bench_function("cell_range_parse_columns", |bench| {
        bench.iter(|| CellRange::parse(black_box("C:XFD")))
    });
}

fn bench_colors(c: &mut Criterion) {
    c.bench_function("normalize_hex_short", |b| {
        b.iter(|| normalize_hex_color(black_box("#fa3")))
    });
    c.bench_function("normalize_rgba", |b| {
        b.iter(|| normalize_hex_color(black_box("rgba(255, 170, 51, 0.5)")))
    });

    let stored: Vec<String> = (0..18u32)
        .map(|i| format!("#{:02X}{:02X}{:02X}", i * 7, i * 11, i * 13))
        .chain(["".to_string(), "#000000".to_string(), "junk".to_string()])
        .collect();
    c.bench_function("dedupe_recent_colors", |b| {
        b.iter(|| dedupe_colors(black_box(&stored)))
    });
}

fn bench_evaluate_selection(c: &mut Criterion) {
    let host = MemoryHost::with_sheets(&["Sheet1", "Sheet2"]);
    host.define_name("PaneTrigger", "=Sheet1!$B$2:$D$4");
    let controller = PaneController::new(host, PaneConfig::default()).unwrap();
    block_on(controller.start());

    c.bench_function("intersects_memory_host", |b| {
        let sel = parse_qualified_address("Sheet1!C3");
        let target = parse_qualified_address("Sheet1!B2:D4");
        b.iter(|| block_on(intersects(controller.host(), black_box(&sel), black_box(&target))))
    });

    c.bench_function("evaluate_selection_toggle", |b| {
        let mut inside = false;
        b.iter(|| {
            inside = !inside;
            let address = if inside { "Sheet1!C3" } else { "Sheet2!C3" };
            controller.host().advance(1_000.0);
            block_on(controller.evaluate_selection(Some(black_box(address))))
        })
    });

    let fallback = PaneConfig {
        trigger: TriggerConfig::fallback("Sheet1", "B2"),
        ..PaneConfig::default()
    };
    let controller = PaneController::new(MemoryHost::new(), fallback).unwrap();
    c.bench_function("evaluate_selection_fallback_miss", |b| {
        b.iter(|| block_on(controller.evaluate_selection(Some(black_box("Sheet1!Z99")))))
    });
}

criterion_group!(
    benches,
    bench_parse_address,
    bench_range_intersection,
    bench_colors,
    bench_evaluate_selection
);
criterion_main!(benches);
