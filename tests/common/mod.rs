//! Common test utilities for driving a controller against `MemoryHost`.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use futures::executor::block_on;
use xlpane::{MemoryHost, PaneAction, PaneConfig, PaneController, StoreConfig, TriggerConfig};

/// Controller with the default configuration, not yet started.
pub fn controller(host: MemoryHost) -> PaneController<MemoryHost> {
    controller_with(host, PaneConfig::default())
}

pub fn controller_with(host: MemoryHost, config: PaneConfig) -> PaneController<MemoryHost> {
    PaneController::new(host, config).expect("valid config")
}

/// Controller whose trigger is the literal fallback `sheet!address`.
pub fn fallback_controller(
    host: MemoryHost,
    sheet: &str,
    address: &str,
) -> PaneController<MemoryHost> {
    controller_with(
        host,
        PaneConfig {
            trigger: TriggerConfig::fallback(sheet, address),
            ..PaneConfig::default()
        },
    )
}

/// Controller with a small store, for list-shape assertions.
pub fn store_controller(host: MemoryHost, capacity: u32) -> PaneController<MemoryHost> {
    controller_with(
        host,
        PaneConfig {
            store: StoreConfig {
                capacity,
                ..StoreConfig::default()
            },
            ..PaneConfig::default()
        },
    )
}

/// Started controller over the given sheets.
pub fn started(sheets: &[&str]) -> PaneController<MemoryHost> {
    let ctl = controller(MemoryHost::with_sheets(sheets));
    block_on(ctl.start()).expect("startup succeeds");
    ctl
}

/// Select `qualified` in the host and deliver the resulting event.
pub fn select(ctl: &PaneController<MemoryHost>, qualified: &str) -> Option<PaneAction> {
    let event = ctl.host().select(qualified).expect("selectable address");
    block_on(ctl.on_host_event(event))
}

/// Hex color `#RRGGBB` built from an index, distinct for `i < 256`.
pub fn color(i: u32) -> String {
    format!("#{:02X}0000", i)
}
