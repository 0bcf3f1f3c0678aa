//! Host capability traits.
//!
//! Everything the controller needs from Excel is expressed here as async
//! capabilities, split by concern so each component asks for the narrowest
//! bound it uses. `MemoryHost` implements them in-process for tests and the
//! CLI; `JsHost` (wasm32) forwards them to an Office.js bridge object.
#![allow(async_fn_in_trait)]

pub mod memory;

#[cfg(target_arch = "wasm32")]
pub mod js;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::watcher::{EventKind, SubscriptionHandle, WorkbookEventKind};

/// A worksheet as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub id: String,
    pub name: String,
}

/// Which formats of the selection a color action touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorTargets {
    pub fill: bool,
    pub font: bool,
    pub borders: bool,
}

impl ColorTargets {
    pub const FILL: Self = Self {
        fill: true,
        font: false,
        borders: false,
    };

    pub fn any(&self) -> bool {
        self.fill || self.font || self.borders
    }
}

/// Which color of the selection to read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorSource {
    Fill,
    Font,
}

impl ColorSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fill => "fill",
            Self::Font => "font",
        }
    }
}

/// Current selection and the formats applied to it.
pub trait SelectionHost {
    /// Sheet-qualified address of the active selection.
    async fn selected_address(&self) -> Result<String>;

    /// Display name of the sheet with the given id.
    async fn sheet_name(&self, sheet_id: &str) -> Result<String>;

    /// Raw fill or font color of the selection, if any.
    async fn selection_color(&self, source: ColorSource) -> Result<Option<String>>;

    async fn format_selection(&self, color: &str, targets: ColorTargets) -> Result<()>;

    async fn clear_selection_format(&self) -> Result<()>;
}

/// Workbook-level named references.
pub trait NameRegistry {
    /// Reference text of `name` (e.g. `=Sheet1!$B$2`), or `None` if the name
    /// does not exist.
    async fn resolve_name(&self, name: &str) -> Result<Option<String>>;
}

/// Sheet enumeration and notification subscriptions.
///
/// Subscribing a kind the host does not offer fails with
/// [`XlpaneError::HostUnavailable`](crate::error::XlpaneError::HostUnavailable).
pub trait EventHost {
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>>;

    async fn subscribe(&self, sheet_id: &str, kind: EventKind) -> Result<SubscriptionHandle>;

    async fn subscribe_workbook(&self, kind: WorkbookEventKind) -> Result<SubscriptionHandle>;

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()>;
}

/// Grid geometry owned by the host.
pub trait RangeGeometry {
    /// Intersection of two ranges on `sheet`, or `None` when empty.
    async fn intersect(&self, sheet: &str, a: &str, b: &str) -> Result<Option<String>>;
}

/// Cell storage used by the recent-colors store.
pub trait WorkbookRanges {
    async fn find_sheet(&self, name: &str) -> Result<Option<SheetInfo>>;

    async fn add_hidden_sheet(&self, name: &str) -> Result<SheetInfo>;

    /// Cell text of `range` as rows of columns.
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>>;

    async fn write_range(&self, sheet: &str, range: &str, values: &[Vec<String>]) -> Result<()>;

    /// Set the number format of `range` to text (`@`).
    async fn set_text_format(&self, sheet: &str, range: &str) -> Result<()>;
}

/// The task pane, the alert surface and the clock.
pub trait PaneHost {
    async fn show_pane(&self) -> Result<()>;

    async fn hide_pane(&self) -> Result<()>;

    /// Non-blocking user notification tagged with the failed action.
    fn report_error(&self, action: &str, message: &str);

    /// Wall-clock milliseconds.
    fn now_ms(&self) -> f64;
}

/// Everything the controller needs.
pub trait Host:
    SelectionHost + NameRegistry + EventHost + RangeGeometry + WorkbookRanges + PaneHost
{
}

impl<T> Host for T where
    T: SelectionHost + NameRegistry + EventHost + RangeGeometry + WorkbookRanges + PaneHost
{
}
