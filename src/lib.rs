//! xlpane - selection-triggered task pane for Excel add-ins
//!
//! Runs inside an Office add-in via WebAssembly:
//! - Opens the task pane when the selection touches a trigger cell or range
//!   (a workbook name, or a configured fallback address), closes it when the
//!   selection leaves
//! - Watches every sheet, including sheets added after startup
//! - Keeps a deduplicated recent-colors list in a hidden worksheet
//! - Color actions: apply, read back, clear, eyedropper, quick fill
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { XlPane } from 'xlpane';
//! await init();
//! const pane = new XlPane(bridge, {});
//! await pane.start();
//! ```
//!
//! The crate builds natively as well; [`MemoryHost`] stands in for Excel in
//! tests and in the `xlpane_cli` replay tool.

// Primitives
pub mod address;
pub mod cell_ref;
pub mod color;
pub mod config;
pub mod error;
pub mod logging;

// Session components
pub mod controller;
pub mod debounce;
pub mod host;
pub mod store;
pub mod trigger;
pub mod watcher;

// JavaScript entry points
#[cfg(target_arch = "wasm32")]
pub mod addin;

use wasm_bindgen::prelude::*;

pub use address::{parse_qualified_address, Address};
pub use config::PaneConfig;
pub use controller::PaneController;
pub use debounce::{PaneAction, VisibilityState};
pub use error::{Result, XlpaneError};
pub use host::memory::MemoryHost;
pub use host::{ColorSource, ColorTargets, Host};
pub use store::StoreConfig;
pub use trigger::TriggerConfig;
pub use watcher::HostEvent;

#[cfg(target_arch = "wasm32")]
pub use addin::XlPane;

/// Normalize a user-entered color to `#RRGGBB` or `#RRGGBBAA`, or `null` if
/// invalid.
#[wasm_bindgen(js_name = normalizeHexColor)]
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    color::normalize_hex_color(raw)
}

/// Six-digit form of a color for `<input type="color">`, or `null` if invalid.
#[wasm_bindgen(js_name = swatchHex)]
pub fn swatch_hex(raw: &str) -> Option<String> {
    color::swatch_hex(raw)
}

/// Theme accents for hosts that expose no Office theme.
#[wasm_bindgen(js_name = themeColors)]
pub fn theme_colors() -> Vec<String> {
    color::FALLBACK_THEME_COLORS
        .iter()
        .map(|c| (*c).to_string())
        .collect()
}

/// The swatch palette shown in the pane, as `#RRGGBB` strings.
#[wasm_bindgen(js_name = standardPalette)]
pub fn standard_palette() -> Vec<String> {
    color::STANDARD_PALETTE
        .iter()
        .map(|c| (*c).to_string())
        .collect()
}

/// Crate version, for the pane's about box.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
