//! Recent-colors list persisted in a hidden worksheet.
//!
//! The add-in has no durable storage of its own, so the list lives in one
//! column of a hidden sheet: one color per row, most recent at the top,
//! blank rows for unused slots. The in-memory cache mirrors the last
//! successful read or write.

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

use crate::cell_ref::{format_cell_ref, parse_cell_ref};
use crate::color::normalize_hex_color;
use crate::error::{Result, XlpaneError};
use crate::host::WorkbookRanges;

/// Default number of recent colors kept.
pub const DEFAULT_CAPACITY: u32 = 18;

/// Location and size of the backing region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub sheet_name: String,
    /// Top cell of the single-column region.
    pub start_cell: String,
    pub capacity: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sheet_name: "__xlpane_recent".to_string(),
            start_cell: "A1".to_string(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// A1 address of the `capacity` rows starting at `start_cell`.
    pub fn region(&self) -> Result<String> {
        let (col, row) = parse_cell_ref(&self.start_cell).ok_or_else(|| {
            XlpaneError::Config(format!("invalid store start cell {:?}", self.start_cell))
        })?;
        if self.capacity == 0 {
            return Err(XlpaneError::Config("store capacity must be at least 1".into()));
        }
        let last_row = row
            .checked_add(self.capacity - 1)
            .filter(|r| *r < crate::cell_ref::MAX_ROWS)
            .ok_or_else(|| XlpaneError::Config("store region runs past the last row".into()))?;
        Ok(format!(
            "{}:{}",
            format_cell_ref(col, row),
            format_cell_ref(col, last_row)
        ))
    }

    fn capacity(&self) -> usize {
        usize::try_from(self.capacity).unwrap_or(usize::MAX)
    }
}

/// Normalize, drop invalid entries and keep the first occurrence of each color.
pub fn dedupe_colors<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if let Some(color) = normalize_hex_color(value.as_ref()) {
            if !out.contains(&color) {
                out.push(color);
            }
        }
    }
    out
}

/// Lay `list` out as exactly `capacity` single-cell rows, blank-padded.
fn to_rows(list: &[String], capacity: usize) -> Vec<Vec<String>> {
    (0..capacity)
        .map(|i| vec![list.get(i).cloned().unwrap_or_default()])
        .collect()
}

/// Deduplicating, bounded, most-recent-first list backed by a cell region.
#[derive(Debug)]
pub struct BoundedListStore {
    config: StoreConfig,
    cache: RefCell<Vec<String>>,
    loaded: Cell<bool>,
    ensured: Cell<bool>,
}

impl BoundedListStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            cache: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
            ensured: Cell::new(false),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The in-memory list, without touching the host.
    pub fn cached(&self) -> Vec<String> {
        self.cache.borrow().clone()
    }

    /// Create the hidden sheet if needed and format its region as text, once
    /// per session.
    ///
    /// Text format keeps Excel from turning stored values into numbers or
    /// dates. The format is applied even to an existing sheet, so a session
    /// whose first attempt failed halfway retries it.
    pub async fn ensure_store<H: WorkbookRanges>(&self, host: &H) -> Result<()> {
        if self.ensured.get() {
            return Ok(());
        }
        let region = self.config.region()?;
        if host.find_sheet(&self.config.sheet_name).await?.is_none() {
            host.add_hidden_sheet(&self.config.sheet_name).await?;
            log::info!("created store sheet {}", self.config.sheet_name);
        }
        host.set_text_format(&self.config.sheet_name, &region)
            .await?;
        log::debug!("store region {region} formatted as text");
        self.ensured.set(true);
        Ok(())
    }

    /// Load the persisted list. Blank, malformed and duplicate rows are
    /// skipped rather than reported.
    pub async fn read<H: WorkbookRanges>(&self, host: &H) -> Result<Vec<String>> {
        self.ensure_store(host).await?;
        let region = self.config.region()?;
        let rows = host.read_range(&self.config.sheet_name, &region).await?;

        let mut list = dedupe_colors(rows.iter().filter_map(|row| row.first()));
        list.truncate(self.config.capacity());

        *self.cache.borrow_mut() = list.clone();
        self.loaded.set(true);
        Ok(list)
    }

    /// Persist `list` (normalized, deduplicated, truncated to capacity) and
    /// clear the rows below it. Returns what was stored.
    pub async fn write<H: WorkbookRanges>(&self, host: &H, list: &[String]) -> Result<Vec<String>> {
        self.ensure_store(host).await?;
        let region = self.config.region()?;

        let mut clean = dedupe_colors(list);
        clean.truncate(self.config.capacity());
        let rows = to_rows(&clean, self.config.capacity());
        host.write_range(&self.config.sheet_name, &region, &rows)
            .await?;

        *self.cache.borrow_mut() = clean.clone();
        self.loaded.set(true);
        Ok(clean)
    }

    /// Move `value` to the front. Invalid colors are ignored and the current
    /// list is returned unchanged.
    pub async fn push<H: WorkbookRanges>(&self, host: &H, value: &str) -> Result<Vec<String>> {
        let Some(color) = normalize_hex_color(value) else {
            log::debug!("ignoring invalid color {value:?}");
            return Ok(self.cached());
        };

        // A fresh session must not overwrite history it has not seen yet.
        if !self.loaded.get() {
            self.read(host).await?;
        }

        let mut next = vec![color.clone()];
        next.extend(self.cache.borrow().iter().filter(|c| **c != color).cloned());
        self.write(host, &next).await
    }
}
