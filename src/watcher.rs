//! Selection watching across a changing set of sheets.
//!
//! Every sheet gets selection-changed, single-click and activated
//! subscriptions exactly once, whether it existed at startup or was added
//! later. Host notifications come back in as [`HostEvent`] values through the
//! controller's single dispatch entry point.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, XlpaneError};
use crate::host::EventHost;

/// Per-sheet notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    SelectionChanged,
    SingleClicked,
    Activated,
}

impl EventKind {
    pub const ALL: [Self; 3] = [Self::SelectionChanged, Self::SingleClicked, Self::Activated];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelectionChanged => "selectionChanged",
            Self::SingleClicked => "singleClicked",
            Self::Activated => "activated",
        }
    }
}

/// Workbook-level sheet lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkbookEventKind {
    SheetAdded,
    SheetDeleted,
}

impl WorkbookEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SheetAdded => "sheetAdded",
            Self::SheetDeleted => "sheetDeleted",
        }
    }
}

/// Opaque token returned by the host for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionHandle(pub String);

/// A notification delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostEvent {
    SelectionChanged {
        sheet_id: String,
        #[serde(default)]
        address: Option<String>,
    },
    SingleClicked {
        sheet_id: String,
        #[serde(default)]
        address: Option<String>,
    },
    SheetActivated {
        sheet_id: String,
    },
    SheetAdded {
        sheet_id: String,
    },
    SheetDeleted {
        sheet_id: String,
    },
    PaneVisibilityChanged {
        visible: bool,
    },
}

impl HostEvent {
    /// Action tag used when a failure in this reaction is reported.
    pub fn action(&self) -> &'static str {
        match self {
            Self::SelectionChanged { .. } => "selectionChanged",
            Self::SingleClicked { .. } => "singleClicked",
            Self::SheetActivated { .. } => "sheetActivated",
            Self::SheetAdded { .. } => "sheetAdded",
            Self::SheetDeleted { .. } => "sheetDeleted",
            Self::PaneVisibilityChanged { .. } => "paneVisibilityChanged",
        }
    }
}

/// Sheet id → subscription handles; a sheet appears at most once.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    sheets: HashMap<String, Vec<SubscriptionHandle>>,
}

impl WatcherRegistry {
    pub fn contains(&self, sheet_id: &str) -> bool {
        self.sheets.contains_key(sheet_id)
    }

    /// Returns `false` (and keeps the existing entry) if already present.
    pub fn insert(&mut self, sheet_id: &str, handles: Vec<SubscriptionHandle>) -> bool {
        if self.contains(sheet_id) {
            return false;
        }
        self.sheets.insert(sheet_id.to_string(), handles);
        true
    }

    pub fn remove(&mut self, sheet_id: &str) -> Option<Vec<SubscriptionHandle>> {
        self.sheets.remove(sheet_id)
    }

    pub fn handles(&self, sheet_id: &str) -> &[SubscriptionHandle] {
        self.sheets.get(sheet_id).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Subscription bookkeeping for all sheets of the session.
#[derive(Debug, Default)]
pub struct SelectionWatcher {
    registry: RefCell<WatcherRegistry>,
    unavailable: RefCell<HashSet<EventKind>>,
    workbook_handles: RefCell<HashMap<WorkbookEventKind, SubscriptionHandle>>,
}

impl SelectionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watched(&self, sheet_id: &str) -> bool {
        self.registry.borrow().contains(sheet_id)
    }

    pub fn watched_count(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn handles(&self, sheet_id: &str) -> Vec<SubscriptionHandle> {
        self.registry.borrow().handles(sheet_id).to_vec()
    }

    /// Event kinds the host turned out not to support.
    pub fn unavailable_kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<_> = self.unavailable.borrow().iter().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub fn tracks_deletion(&self) -> bool {
        self.workbook_handles
            .borrow()
            .contains_key(&WorkbookEventKind::SheetDeleted)
    }

    /// Subscribe to sheet lifecycle notifications and instrument every
    /// existing sheet. Returns the number of sheets newly instrumented.
    ///
    /// Safe to call again after a partial failure: workbook and sheet
    /// subscriptions that already exist are not repeated. A failure does not
    /// stop the remaining steps; the last one is returned after everything
    /// was tried.
    pub async fn start<H: EventHost>(&self, host: &H) -> Result<usize> {
        let mut last_err = None;

        match self.watch_workbook(host, WorkbookEventKind::SheetAdded).await {
            Ok(()) => {}
            Err(XlpaneError::HostUnavailable(what)) => {
                log::warn!("{what} unavailable; sheets added later will not be watched");
            }
            Err(e) => {
                log::warn!("could not watch for added sheets: {e}");
                last_err = Some(e);
            }
        }

        match self.watch_workbook(host, WorkbookEventKind::SheetDeleted).await {
            Ok(()) => {}
            Err(XlpaneError::HostUnavailable(what)) => {
                // Without deletion events the registry keeps one entry per
                // sheet created this session.
                log::warn!("{what} unavailable; registry entries of deleted sheets are kept");
            }
            Err(e) => {
                log::warn!("could not watch for deleted sheets: {e}");
                last_err = Some(e);
            }
        }

        let sheets = host.list_sheets().await?;
        let mut instrumented = 0;
        for sheet in &sheets {
            match self.instrument_sheet(host, &sheet.id).await {
                Ok(true) => instrumented += 1,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("could not watch sheet {}: {e}", sheet.name);
                    last_err = Some(e);
                }
            }
        }
        log::info!(
            "watching {} of {} sheets",
            self.watched_count(),
            sheets.len()
        );

        match last_err {
            Some(e) => Err(e),
            None => Ok(instrumented),
        }
    }

    /// Subscribe one workbook-level kind unless already subscribed.
    async fn watch_workbook<H: EventHost>(&self, host: &H, kind: WorkbookEventKind) -> Result<()> {
        if self.workbook_handles.borrow().contains_key(&kind) {
            return Ok(());
        }
        let handle = host.subscribe_workbook(kind).await?;
        let replaced = self.workbook_handles.borrow_mut().insert(kind, handle);
        if let Some(extra) = replaced {
            // A concurrent start subscribed meanwhile; keep one.
            if let Err(e) = host.unsubscribe(&extra).await {
                log::debug!("unsubscribe duplicate {}: {e}", extra.0);
            }
        }
        Ok(())
    }

    /// Subscribe every supported kind on `sheet_id` unless it is already
    /// watched. Returns whether the sheet was newly instrumented.
    pub async fn instrument_sheet<H: EventHost>(&self, host: &H, sheet_id: &str) -> Result<bool> {
        if self.is_watched(sheet_id) {
            return Ok(false);
        }

        let mut handles = Vec::new();
        for kind in EventKind::ALL {
            if self.unavailable.borrow().contains(&kind) {
                continue;
            }
            match host.subscribe(sheet_id, kind).await {
                Ok(handle) => handles.push(handle),
                Err(XlpaneError::HostUnavailable(what)) => {
                    log::warn!("{what} unavailable; continuing without {}", kind.as_str());
                    self.unavailable.borrow_mut().insert(kind);
                }
                Err(e) => {
                    // Roll back so a later attempt does not double-subscribe.
                    for handle in &handles {
                        if let Err(undo) = host.unsubscribe(handle).await {
                            log::debug!("rollback unsubscribe {}: {undo}", handle.0);
                        }
                    }
                    return Err(e);
                }
            }
        }

        // A concurrent reaction may have instrumented the sheet meanwhile.
        if !self.registry.borrow_mut().insert(sheet_id, handles.clone()) {
            for handle in &handles {
                if let Err(e) = host.unsubscribe(handle).await {
                    log::debug!("unsubscribe duplicate {}: {e}", handle.0);
                }
            }
            return Ok(false);
        }
        log::debug!("watching sheet {sheet_id} ({} subscriptions)", handles.len());
        Ok(true)
    }

    /// Drop a deleted sheet from the registry. Unsubscribe failures are
    /// expected (the sheet is gone) and ignored.
    pub async fn forget_sheet<H: EventHost>(&self, host: &H, sheet_id: &str) -> bool {
        let Some(handles) = self.registry.borrow_mut().remove(sheet_id) else {
            return false;
        };
        for handle in &handles {
            if let Err(e) = host.unsubscribe(handle).await {
                log::debug!("unsubscribe {} after delete: {e}", handle.0);
            }
        }
        true
    }
}
