//! In-process workbook implementing every host capability.
//!
//! Used by the integration tests and the replay CLI. It behaves like Excel
//! where the controller can observe the difference (case-insensitive sheet
//! and name lookup, unqualified event addresses, rejected calls on deleted
//! sheets) and adds hooks for injecting failures, missing capabilities and
//! interleaved evaluations.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::address::{parse_qualified_address, Address};
use crate::cell_ref::CellRange;
use crate::error::{Result, XlpaneError};
use crate::host::{
    ColorSource, ColorTargets, EventHost, NameRegistry, PaneHost, RangeGeometry, SelectionHost,
    SheetInfo, WorkbookRanges,
};
use crate::watcher::{EventKind, HostEvent, SubscriptionHandle, WorkbookEventKind};

/// Largest block the memory host will materialize cell by cell.
const MAX_MATERIALIZED_CELLS: u64 = 100_000;

#[derive(Debug, Default)]
struct MemorySheet {
    id: String,
    name: String,
    hidden: bool,
    cells: HashMap<(u32, u32), String>,
    fills: HashMap<(u32, u32), String>,
    fonts: HashMap<(u32, u32), String>,
    borders: HashMap<(u32, u32), String>,
    text_ranges: Vec<String>,
}

#[derive(Debug)]
struct Subscription {
    handle: SubscriptionHandle,
    target: String,
    kind: &'static str,
}

#[derive(Debug, Default)]
struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    next_sheet: u32,
    names: HashMap<String, String>,
    selection: Option<(String, CellRange)>,
    pane_visible: bool,
    subscriptions: Vec<Subscription>,
    next_handle: u64,
    unsupported: HashSet<String>,
    reported: Vec<(String, String)>,
    calls: Vec<&'static str>,
    now: f64,
    fail_next: Option<(String, String)>,
    yield_on: HashSet<&'static str>,
}

impl MemoryWorkbook {
    fn sheet_by_id(&self, id: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    fn sheet_by_name(&self, name: &str) -> Option<&MemorySheet> {
        let wanted = name.to_uppercase();
        self.sheets.iter().find(|s| s.name.to_uppercase() == wanted)
    }

    fn sheet_by_name_mut(&mut self, name: &str) -> Option<&mut MemorySheet> {
        let wanted = name.to_uppercase();
        self.sheets
            .iter_mut()
            .find(|s| s.name.to_uppercase() == wanted)
    }

    fn add_sheet(&mut self, name: &str, hidden: bool) -> SheetInfo {
        self.next_sheet += 1;
        let id = format!("{{sheet-{}}}", self.next_sheet);
        self.sheets.push(MemorySheet {
            id: id.clone(),
            name: name.to_string(),
            hidden,
            ..MemorySheet::default()
        });
        SheetInfo {
            id,
            name: name.to_string(),
        }
    }

    /// Selection as (sheet, range), failing if its sheet was deleted.
    fn selection(&self) -> Result<(&MemorySheet, CellRange)> {
        let (sheet_id, range) = self
            .selection
            .as_ref()
            .ok_or_else(|| XlpaneError::Host("nothing is selected".into()))?;
        let sheet = self
            .sheet_by_id(sheet_id)
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet_id} not found")))?;
        Ok((sheet, *range))
    }
}

fn check_size(range: CellRange) -> Result<()> {
    let count = u64::from(range.rows()) * u64::from(range.cols());
    if count > MAX_MATERIALIZED_CELLS {
        return Err(XlpaneError::Host(format!(
            "range {} is too large for the memory host",
            range.to_a1()
        )));
    }
    Ok(())
}

fn cells_of(range: CellRange) -> Result<impl Iterator<Item = (u32, u32)>> {
    check_size(range)?;
    Ok((range.start_row..=range.end_row)
        .flat_map(move |r| (range.start_col..=range.end_col).map(move |c| (r, c))))
}

fn parse_range(range: &str) -> Result<CellRange> {
    CellRange::parse(range)
        .ok_or_else(|| XlpaneError::Host(format!("the argument {range:?} is invalid")))
}

/// Pending once, then ready: lets a concurrent evaluation run in between.
#[derive(Debug, Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// In-memory Excel stand-in.
#[derive(Debug)]
pub struct MemoryHost {
    state: RefCell<MemoryWorkbook>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::with_sheets(&["Sheet1"])
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workbook with the given visible sheets; A1 of the first is selected.
    pub fn with_sheets(names: &[&str]) -> Self {
        let mut wb = MemoryWorkbook::default();
        for name in names {
            wb.add_sheet(name, false);
        }
        wb.selection = wb
            .sheets
            .first()
            .map(|s| (s.id.clone(), CellRange::new(0, 0, 0, 0)));
        Self {
            state: RefCell::new(wb),
        }
    }

    /// Record the call and fail it if a failure was queued for it.
    fn begin(&self, call: &'static str) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.calls.push(call);
        if s.fail_next.as_ref().is_some_and(|(name, _)| name == call) {
            if let Some((_, message)) = s.fail_next.take() {
                return Err(XlpaneError::Host(message));
            }
        }
        Ok(())
    }

    // ---- Workbook setup and user simulation ----

    /// Add a visible sheet (as a user would) and return its id. No event is
    /// delivered; pass `HostEvent::SheetAdded` to the controller yourself.
    pub fn add_sheet(&self, name: &str) -> String {
        self.state.borrow_mut().add_sheet(name, false).id
    }

    /// Delete a sheet along with its subscriptions.
    pub fn delete_sheet(&self, name: &str) -> Option<String> {
        let mut s = self.state.borrow_mut();
        let wanted = name.to_uppercase();
        let idx = s
            .sheets
            .iter()
            .position(|sheet| sheet.name.to_uppercase() == wanted)?;
        let sheet = s.sheets.remove(idx);
        s.subscriptions.retain(|sub| sub.target != sheet.id);
        Some(sheet.id)
    }

    pub fn sheet_id(&self, name: &str) -> Option<String> {
        self.state.borrow().sheet_by_name(name).map(|s| s.id.clone())
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .sheets
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.state
            .borrow()
            .sheet_by_name(name)
            .is_some_and(|s| s.hidden)
    }

    /// Define or redefine a workbook name, e.g. `("PaneTrigger", "=Sheet1!$B$2")`.
    pub fn define_name(&self, name: &str, reference: &str) {
        self.state
            .borrow_mut()
            .names
            .insert(name.to_uppercase(), reference.to_string());
    }

    pub fn remove_name(&self, name: &str) {
        self.state.borrow_mut().names.remove(&name.to_uppercase());
    }

    /// Select a sheet-qualified range and return the selection-changed event
    /// Excel would deliver (unqualified address, sheet id).
    pub fn select(&self, qualified: &str) -> Result<HostEvent> {
        let addr = parse_qualified_address(qualified);
        let range = parse_range(&addr.cells)?;
        let mut s = self.state.borrow_mut();
        let sheet_id = s
            .sheet_by_name(&addr.sheet_name)
            .map(|sheet| sheet.id.clone())
            .ok_or_else(|| XlpaneError::Host(format!("sheet {} not found", addr.sheet_name)))?;
        s.selection = Some((sheet_id.clone(), range));
        Ok(HostEvent::SelectionChanged {
            sheet_id,
            address: Some(range.to_a1()),
        })
    }

    /// Simulate the user opening or closing the pane.
    pub fn set_pane_visible(&self, visible: bool) -> HostEvent {
        self.state.borrow_mut().pane_visible = visible;
        HostEvent::PaneVisibilityChanged { visible }
    }

    pub fn pane_visible(&self) -> bool {
        self.state.borrow().pane_visible
    }

    pub fn set_now(&self, ms: f64) {
        self.state.borrow_mut().now = ms;
    }

    pub fn advance(&self, ms: f64) {
        self.state.borrow_mut().now += ms;
    }

    /// Make the host reject subscriptions of this kind
    /// (`"singleClicked"`, `"sheetDeleted"`, ...).
    pub fn mark_unsupported(&self, kind: &str) {
        self.state.borrow_mut().unsupported.insert(kind.to_string());
    }

    /// Fail the next call named `call` (bridge method name, e.g. `"intersect"`).
    pub fn fail_next(&self, call: &str, message: &str) {
        self.state.borrow_mut().fail_next = Some((call.to_string(), message.to_string()));
    }

    /// Make `call` (`"intersect"`, `"showPane"` or `"hidePane"`) yield once
    /// before it completes.
    pub fn set_yield_on(&self, call: &'static str, enabled: bool) {
        let mut s = self.state.borrow_mut();
        if enabled {
            s.yield_on.insert(call);
        } else {
            s.yield_on.remove(call);
        }
    }

    async fn pause(&self, call: &'static str) {
        let should_yield = self.state.borrow().yield_on.contains(call);
        if should_yield {
            YieldNow::default().await;
        }
    }

    // ---- Inspection ----

    /// Errors reported to the user, as (action, message).
    pub fn reported_errors(&self) -> Vec<(String, String)> {
        self.state.borrow().reported.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    /// Kinds subscribed on a sheet (by sheet name), in subscription order.
    pub fn subscriptions_on(&self, sheet_name: &str) -> Vec<&'static str> {
        let s = self.state.borrow();
        let Some(sheet) = s.sheet_by_name(sheet_name) else {
            return Vec::new();
        };
        s.subscriptions
            .iter()
            .filter(|sub| sub.target == sheet.id)
            .map(|sub| sub.kind)
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.borrow().subscriptions.len()
    }

    pub fn cell_text(&self, sheet_name: &str, cell: &str) -> Option<String> {
        let range = CellRange::parse(cell)?;
        let s = self.state.borrow();
        s.sheet_by_name(sheet_name)?
            .cells
            .get(&(range.start_row, range.start_col))
            .cloned()
    }

    pub fn set_cell_text(&self, sheet_name: &str, cell: &str, text: &str) -> Result<()> {
        let range = parse_range(cell)?;
        let mut s = self.state.borrow_mut();
        let sheet = s
            .sheet_by_name_mut(sheet_name)
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet_name} not found")))?;
        sheet
            .cells
            .insert((range.start_row, range.start_col), text.to_string());
        Ok(())
    }

    pub fn set_fill(&self, sheet_name: &str, cell: &str, color: &str) -> Result<()> {
        let range = parse_range(cell)?;
        let mut s = self.state.borrow_mut();
        let sheet = s
            .sheet_by_name_mut(sheet_name)
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet_name} not found")))?;
        sheet
            .fills
            .insert((range.start_row, range.start_col), color.to_string());
        Ok(())
    }

    /// (fill, font, border) colors of one cell.
    pub fn cell_colors(
        &self,
        sheet_name: &str,
        cell: &str,
    ) -> (Option<String>, Option<String>, Option<String>) {
        let s = self.state.borrow();
        let (Some(range), Some(sheet)) = (CellRange::parse(cell), s.sheet_by_name(sheet_name))
        else {
            return (None, None, None);
        };
        let key = (range.start_row, range.start_col);
        (
            sheet.fills.get(&key).cloned(),
            sheet.fonts.get(&key).cloned(),
            sheet.borders.get(&key).cloned(),
        )
    }

    pub fn is_text_formatted(&self, sheet_name: &str, range: &str) -> bool {
        self.state
            .borrow()
            .sheet_by_name(sheet_name)
            .is_some_and(|s| s.text_ranges.iter().any(|r| r == range))
    }
}

impl SelectionHost for MemoryHost {
    async fn selected_address(&self) -> Result<String> {
        self.begin("selectedAddress")?;
        let s = self.state.borrow();
        let (sheet, range) = s.selection()?;
        Ok(Address::new(&sheet.name, &range.to_a1()).to_string())
    }

    async fn sheet_name(&self, sheet_id: &str) -> Result<String> {
        self.begin("sheetName")?;
        self.state
            .borrow()
            .sheet_by_id(sheet_id)
            .map(|s| s.name.clone())
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet_id} not found")))
    }

    async fn selection_color(&self, source: ColorSource) -> Result<Option<String>> {
        self.begin("selectionColor")?;
        let s = self.state.borrow();
        let (sheet, range) = s.selection()?;
        let key = (range.start_row, range.start_col);
        Ok(match source {
            ColorSource::Fill => sheet.fills.get(&key).cloned(),
            ColorSource::Font => sheet.fonts.get(&key).cloned(),
        })
    }

    async fn format_selection(&self, color: &str, targets: ColorTargets) -> Result<()> {
        self.begin("formatSelection")?;
        let mut s = self.state.borrow_mut();
        let (sheet_id, range) = {
            let (sheet, range) = s.selection()?;
            (sheet.id.clone(), range)
        };
        let cells: Vec<_> = cells_of(range)?.collect();
        let Some(sheet) = s.sheets.iter_mut().find(|sh| sh.id == sheet_id) else {
            return Err(XlpaneError::Host(format!("sheet {sheet_id} not found")));
        };
        for key in cells {
            if targets.fill {
                sheet.fills.insert(key, color.to_string());
            }
            if targets.font {
                sheet.fonts.insert(key, color.to_string());
            }
            if targets.borders {
                sheet.borders.insert(key, color.to_string());
            }
        }
        Ok(())
    }

    async fn clear_selection_format(&self) -> Result<()> {
        self.begin("clearSelectionFormat")?;
        let mut s = self.state.borrow_mut();
        let (sheet_id, range) = {
            let (sheet, range) = s.selection()?;
            (sheet.id.clone(), range)
        };
        let cells: Vec<_> = cells_of(range)?.collect();
        let Some(sheet) = s.sheets.iter_mut().find(|sh| sh.id == sheet_id) else {
            return Err(XlpaneError::Host(format!("sheet {sheet_id} not found")));
        };
        for key in cells {
            sheet.fills.remove(&key);
            sheet.fonts.remove(&key);
        }
        Ok(())
    }
}

impl NameRegistry for MemoryHost {
    async fn resolve_name(&self, name: &str) -> Result<Option<String>> {
        self.begin("resolveName")?;
        Ok(self.state.borrow().names.get(&name.to_uppercase()).cloned())
    }
}

impl EventHost for MemoryHost {
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        self.begin("listSheets")?;
        Ok(self
            .state
            .borrow()
            .sheets
            .iter()
            .map(|s| SheetInfo {
                id: s.id.clone(),
                name: s.name.clone(),
            })
            .collect())
    }

    async fn subscribe(&self, sheet_id: &str, kind: EventKind) -> Result<SubscriptionHandle> {
        self.begin("subscribe")?;
        let mut s = self.state.borrow_mut();
        if s.unsupported.contains(kind.as_str()) {
            return Err(XlpaneError::HostUnavailable(format!(
                "worksheet {} event",
                kind.as_str()
            )));
        }
        if s.sheet_by_id(sheet_id).is_none() {
            return Err(XlpaneError::Host(format!("sheet {sheet_id} not found")));
        }
        s.next_handle += 1;
        let handle = SubscriptionHandle(format!("sub-{}", s.next_handle));
        s.subscriptions.push(Subscription {
            handle: handle.clone(),
            target: sheet_id.to_string(),
            kind: kind.as_str(),
        });
        Ok(handle)
    }

    async fn subscribe_workbook(&self, kind: WorkbookEventKind) -> Result<SubscriptionHandle> {
        self.begin("subscribeWorkbook")?;
        let mut s = self.state.borrow_mut();
        if s.unsupported.contains(kind.as_str()) {
            return Err(XlpaneError::HostUnavailable(format!(
                "workbook {} event",
                kind.as_str()
            )));
        }
        s.next_handle += 1;
        let handle = SubscriptionHandle(format!("sub-{}", s.next_handle));
        s.subscriptions.push(Subscription {
            handle: handle.clone(),
            target: "workbook".to_string(),
            kind: kind.as_str(),
        });
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<()> {
        self.begin("unsubscribe")?;
        let mut s = self.state.borrow_mut();
        let before = s.subscriptions.len();
        s.subscriptions.retain(|sub| sub.handle != *handle);
        if s.subscriptions.len() == before {
            return Err(XlpaneError::Host(format!("unknown subscription {}", handle.0)));
        }
        Ok(())
    }
}

impl RangeGeometry for MemoryHost {
    async fn intersect(&self, sheet: &str, a: &str, b: &str) -> Result<Option<String>> {
        self.begin("intersect")?;
        self.pause("intersect").await;
        if self.state.borrow().sheet_by_name(sheet).is_none() {
            return Err(XlpaneError::Host(format!("sheet {sheet} not found")));
        }
        let a = parse_range(a)?;
        let b = parse_range(b)?;
        Ok(a.intersection(&b).map(|r| r.to_a1()))
    }
}

impl WorkbookRanges for MemoryHost {
    async fn find_sheet(&self, name: &str) -> Result<Option<SheetInfo>> {
        self.begin("findSheet")?;
        Ok(self.state.borrow().sheet_by_name(name).map(|s| SheetInfo {
            id: s.id.clone(),
            name: s.name.clone(),
        }))
    }

    async fn add_hidden_sheet(&self, name: &str) -> Result<SheetInfo> {
        self.begin("addHiddenSheet")?;
        let mut s = self.state.borrow_mut();
        if s.sheet_by_name(name).is_some() {
            return Err(XlpaneError::Host(format!("sheet {name} already exists")));
        }
        Ok(s.add_sheet(name, true))
    }

    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        self.begin("readRange")?;
        let block = parse_range(range)?;
        let s = self.state.borrow();
        let sheet = s
            .sheet_by_name(sheet)
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet} not found")))?;
        check_size(block)?;
        Ok((block.start_row..=block.end_row)
            .map(|r| {
                (block.start_col..=block.end_col)
                    .map(|c| sheet.cells.get(&(r, c)).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    async fn write_range(&self, sheet: &str, range: &str, values: &[Vec<String>]) -> Result<()> {
        self.begin("writeRange")?;
        let block = parse_range(range)?;
        let rows_match = usize::try_from(block.rows()).is_ok_and(|n| n == values.len());
        let cols_match = values
            .iter()
            .all(|row| usize::try_from(block.cols()).is_ok_and(|n| n == row.len()));
        if !rows_match || !cols_match {
            return Err(XlpaneError::Host(format!(
                "value dimensions do not match range {range}"
            )));
        }
        let mut s = self.state.borrow_mut();
        let sheet = s
            .sheet_by_name_mut(sheet)
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet} not found")))?;
        for (r, row) in (block.start_row..).zip(values) {
            for (c, value) in (block.start_col..).zip(row) {
                if value.is_empty() {
                    sheet.cells.remove(&(r, c));
                } else {
                    sheet.cells.insert((r, c), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn set_text_format(&self, sheet: &str, range: &str) -> Result<()> {
        self.begin("setTextFormat")?;
        let mut s = self.state.borrow_mut();
        let sheet = s
            .sheet_by_name_mut(sheet)
            .ok_or_else(|| XlpaneError::Host(format!("sheet {sheet} not found")))?;
        sheet.text_ranges.push(range.to_string());
        Ok(())
    }
}

impl PaneHost for MemoryHost {
    async fn show_pane(&self) -> Result<()> {
        self.begin("showPane")?;
        // Applied at issue time; completion may arrive after later calls.
        self.state.borrow_mut().pane_visible = true;
        self.pause("showPane").await;
        Ok(())
    }

    async fn hide_pane(&self) -> Result<()> {
        self.begin("hidePane")?;
        self.state.borrow_mut().pane_visible = false;
        self.pause("hidePane").await;
        Ok(())
    }

    fn report_error(&self, action: &str, message: &str) {
        self.state
            .borrow_mut()
            .reported
            .push((action.to_string(), message.to_string()));
    }

    fn now_ms(&self) -> f64 {
        self.state.borrow().now
    }
}
