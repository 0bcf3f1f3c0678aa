//! Recent-colors store and color actions against the in-memory workbook.
#![cfg(not(target_arch = "wasm32"))]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{color, controller, select, store_controller};
use futures::executor::block_on;
use xlpane::store::BoundedListStore;
use xlpane::{ColorSource, ColorTargets, MemoryHost, StoreConfig, XlpaneError};

const STORE_SHEET: &str = "__xlpane_recent";

// ============================================================================
// Push semantics
// ============================================================================

#[test]
fn test_short_and_long_forms_dedupe() {
    let ctl = controller(MemoryHost::new());

    block_on(ctl.push_color("#fff"));
    let list = block_on(ctl.push_color("#FFFFFF"));

    assert_eq!(list, vec!["#FFFFFF"]);
    assert_eq!(block_on(ctl.get_recent_colors()), vec!["#FFFFFF"]);
}

#[test]
fn test_capacity_evicts_oldest() {
    let ctl = controller(MemoryHost::new());
    for i in 1..=19 {
        block_on(ctl.push_color(&color(i)));
    }

    let expected: Vec<String> = (2..=19).rev().map(color).collect();
    assert_eq!(block_on(ctl.get_recent_colors()), expected);
    assert_eq!(ctl.store().cached().len(), 18);
}

#[test]
fn test_repush_moves_to_front() {
    let ctl = store_controller(MemoryHost::new(), 5);
    for c in ["#111111", "#222222", "#333333"] {
        block_on(ctl.push_color(c));
    }

    let list = block_on(ctl.push_color("#111"));
    assert_eq!(list, vec!["#111111", "#333333", "#222222"]);
}

#[test]
fn test_invalid_push_is_ignored() {
    let ctl = controller(MemoryHost::new());
    block_on(ctl.push_color("#abcdef"));

    let list = block_on(ctl.push_color("not a color"));
    assert_eq!(list, vec!["#ABCDEF"]);
    assert!(ctl.host().reported_errors().is_empty());
}

#[test]
fn test_list_is_persisted_one_per_row() {
    let ctl = store_controller(MemoryHost::new(), 3);
    block_on(ctl.push_color("#010203"));
    block_on(ctl.push_color("#040506"));

    let host = ctl.host();
    assert_eq!(host.cell_text(STORE_SHEET, "A1").as_deref(), Some("#040506"));
    assert_eq!(host.cell_text(STORE_SHEET, "A2").as_deref(), Some("#010203"));
    assert_eq!(host.cell_text(STORE_SHEET, "A3"), None);
}

// ============================================================================
// Backing sheet
// ============================================================================

#[test]
fn test_store_sheet_is_created_hidden_and_text_formatted_once() {
    let ctl = controller(MemoryHost::new());

    block_on(ctl.get_recent_colors());
    block_on(ctl.push_color("#123456"));
    block_on(ctl.get_recent_colors());

    let host = ctl.host();
    assert!(host.is_hidden(STORE_SHEET));
    assert!(host.is_text_formatted(STORE_SHEET, "A1:A18"));
    assert_eq!(host.call_count("addHiddenSheet"), 1);
    assert_eq!(host.call_count("setTextFormat"), 1);
}

#[test]
fn test_existing_store_sheet_is_reused() {
    let host = MemoryHost::with_sheets(&["Sheet1", STORE_SHEET]);
    host.set_cell_text(STORE_SHEET, "A1", "#00ff00").unwrap();
    let ctl = controller(host);

    assert_eq!(block_on(ctl.get_recent_colors()), vec!["#00FF00"]);
    assert_eq!(ctl.host().call_count("addHiddenSheet"), 0);
    assert!(ctl.host().is_text_formatted(STORE_SHEET, "A1:A18"));
}

#[test]
fn test_failed_text_format_is_retried() {
    let ctl = controller(MemoryHost::new());
    ctl.host().fail_next("setTextFormat", "busy");

    assert!(block_on(ctl.push_color("#123456")).is_empty());
    assert_eq!(ctl.host().reported_errors()[0].0, "pushColor");
    assert!(ctl.host().is_hidden(STORE_SHEET));

    // The sheet now exists; the next push must still format it.
    assert_eq!(block_on(ctl.push_color("#654321")), vec!["#654321"]);
    assert!(ctl.host().is_text_formatted(STORE_SHEET, "A1:A18"));
    assert_eq!(ctl.host().call_count("setTextFormat"), 2);
    assert_eq!(ctl.host().call_count("addHiddenSheet"), 1);
}

#[test]
fn test_malformed_rows_are_skipped_on_read() {
    let host = MemoryHost::with_sheets(&["Sheet1", STORE_SHEET]);
    for (cell, text) in [
        ("A1", "#ff0000"),
        ("A2", "hello"),
        ("A3", ""),
        ("A4", "#F00"),
        ("A5", "0000ff"),
        ("A6", "12/05/2024"),
    ] {
        host.set_cell_text(STORE_SHEET, cell, text).unwrap();
    }
    let ctl = controller(host);

    assert_eq!(block_on(ctl.get_recent_colors()), vec!["#FF0000", "#0000FF"]);
    assert!(ctl.host().reported_errors().is_empty());
}

#[test]
fn test_fresh_session_push_keeps_history() {
    let host = MemoryHost::with_sheets(&["Sheet1", STORE_SHEET]);
    host.set_cell_text(STORE_SHEET, "A1", "#AAAAAA").unwrap();
    host.set_cell_text(STORE_SHEET, "A2", "#BBBBBB").unwrap();
    let ctl = controller(host);

    let list = block_on(ctl.push_color("#CCCCCC"));
    assert_eq!(list, vec!["#CCCCCC", "#AAAAAA", "#BBBBBB"]);
}

#[test]
fn test_write_failure_is_reported_and_cache_kept() {
    let ctl = controller(MemoryHost::new());
    block_on(ctl.push_color("#111111"));
    ctl.host().fail_next("writeRange", "workbook is read-only");

    let list = block_on(ctl.push_color("#222222"));
    assert_eq!(list, vec!["#111111"]);
    assert_eq!(ctl.host().reported_errors()[0].0, "pushColor");
}

#[test]
fn test_direct_store_round_trip() {
    let host = MemoryHost::new();
    let store = BoundedListStore::new(StoreConfig {
        sheet_name: "colors".into(),
        start_cell: "C2".into(),
        capacity: 4,
    });

    let stored = block_on(store.write(
        &host,
        &["#abc".into(), "#AABBCC".into(), "nope".into(), "#123".into()],
    ))
    .unwrap();
    assert_eq!(stored, vec!["#AABBCC", "#112233"]);
    assert_eq!(host.cell_text("colors", "C3").as_deref(), Some("#112233"));
    assert!(host.is_text_formatted("colors", "C2:C5"));
    assert_eq!(block_on(store.read(&host)).unwrap(), stored);
}

#[test]
fn test_bad_store_config_fails_fast() {
    let store = BoundedListStore::new(StoreConfig {
        capacity: 0,
        ..StoreConfig::default()
    });
    let err = block_on(store.read(&MemoryHost::new())).unwrap_err();
    assert!(matches!(err, XlpaneError::Config(_)));
}

// ============================================================================
// Color actions
// ============================================================================

#[test]
fn test_apply_color_formats_targets_and_remembers() {
    let ctl = controller(MemoryHost::new());
    ctl.host().select("Sheet1!B2:C3").unwrap();

    let targets = ColorTargets {
        fill: true,
        font: false,
        borders: true,
    };
    let list = block_on(ctl.apply_color("ffaa33", targets)).unwrap();
    assert_eq!(list, vec!["#FFAA33"]);

    let (fill, font, border) = ctl.host().cell_colors("Sheet1", "C3");
    assert_eq!(fill.as_deref(), Some("#FFAA33"));
    assert_eq!(font, None);
    assert_eq!(border.as_deref(), Some("#FFAA33"));
}

#[test]
fn test_apply_color_rejects_bad_input() {
    let ctl = controller(MemoryHost::new());

    assert_eq!(block_on(ctl.apply_color("#GGG", ColorTargets::FILL)), None);
    assert_eq!(
        block_on(ctl.apply_color("#FFAA33", ColorTargets::default())),
        None
    );

    let errors = ctl.host().reported_errors();
    assert_eq!(errors[0].1, "Enter a valid hex color like #FFAA33");
    assert_eq!(errors[1].1, "Choose at least one target (Fill, Font, Borders).");
    assert_eq!(ctl.host().call_count("formatSelection"), 0);
    assert!(ctl.store().cached().is_empty());
}

#[test]
fn test_read_and_clear_selection_color() {
    let ctl = controller(MemoryHost::new());
    ctl.host().set_fill("Sheet1", "A1", "#00ff7f").unwrap();

    assert_eq!(
        block_on(ctl.read_selection_color(ColorSource::Fill)).as_deref(),
        Some("#00FF7F")
    );
    assert_eq!(block_on(ctl.read_selection_color(ColorSource::Font)), None);

    assert!(block_on(ctl.clear_selection_format()));
    assert_eq!(block_on(ctl.read_selection_color(ColorSource::Fill)), None);
}

#[test]
fn test_quick_fill_uses_fixed_color_without_touching_recent() {
    let ctl = controller(MemoryHost::new());
    assert!(block_on(ctl.quick_fill()));

    assert_eq!(
        ctl.host().cell_colors("Sheet1", "A1").0.as_deref(),
        Some("#FFF7AB")
    );
    assert_eq!(ctl.host().call_count("writeRange"), 0);
}

#[test]
fn test_eyedropper_samples_next_selection() {
    let ctl = controller(MemoryHost::new());
    ctl.host().set_fill("Sheet1", "D4", "#336699").unwrap();

    ctl.sample_next_selection();
    assert!(ctl.is_sampling());
    select(&ctl, "Sheet1!D4");

    assert!(!ctl.is_sampling());
    assert_eq!(ctl.store().cached(), vec!["#336699"]);

    // Disarmed after one sample.
    ctl.host().set_fill("Sheet1", "E5", "#000000").unwrap();
    select(&ctl, "Sheet1!E5");
    assert_eq!(ctl.store().cached(), vec!["#336699"]);
}
