//! The session controller.
//!
//! `PaneController` owns all per-session state (visibility, watcher
//! registry, recent-colors cache) and is the only thing host notifications
//! and UI actions talk to. Every public entry point catches its own failures,
//! reports them through [`PaneHost::report_error`], and leaves the controller
//! ready for the next call.

use std::cell::{Cell, RefCell};
use std::future::Future;

use crate::address::{intersects, parse_qualified_address, Address};
use crate::color::{normalize_hex_color, QUICK_FILL_COLOR};
use crate::config::PaneConfig;
use crate::debounce::{PaneAction, VisibilityDebouncer, VisibilityState};
use crate::error::{Result, XlpaneError};
use crate::host::{ColorSource, ColorTargets, Host};
use crate::store::BoundedListStore;
use crate::trigger::TriggerResolver;
use crate::watcher::{HostEvent, SelectionWatcher};

pub struct PaneController<H> {
    host: H,
    config: PaneConfig,
    debouncer: RefCell<VisibilityDebouncer>,
    watcher: SelectionWatcher,
    store: BoundedListStore,
    /// Sequence number of the most recently started evaluation.
    issued: Cell<u64>,
    sampler_armed: Cell<bool>,
}

impl<H: Host> PaneController<H> {
    /// Build a controller for one session. Fails only on invalid config.
    pub fn new(host: H, config: PaneConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            debouncer: RefCell::new(VisibilityDebouncer::new(config.min_open_interval_ms)),
            watcher: SelectionWatcher::new(),
            store: BoundedListStore::new(config.store.clone()),
            issued: Cell::new(0),
            sampler_armed: Cell::new(false),
            host,
            config,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &PaneConfig {
        &self.config
    }

    pub fn visibility(&self) -> VisibilityState {
        self.debouncer.borrow().state()
    }

    pub fn watcher(&self) -> &SelectionWatcher {
        &self.watcher
    }

    pub fn store(&self) -> &BoundedListStore {
        &self.store
    }

    /// Instrument all existing sheets and subscribe to sheet lifecycle
    /// events. Returns the number of sheets instrumented, or `None` if
    /// startup hit a failure (already reported).
    pub async fn start(&self) -> Option<usize> {
        match self.watcher.start(&self.host).await {
            Ok(count) => Some(count),
            Err(e) => {
                self.report("start", &e);
                None
            }
        }
    }

    /// Single entry point for host notifications. Returns the pane action
    /// taken, if any.
    pub async fn on_host_event(&self, event: HostEvent) -> Option<PaneAction> {
        let action = event.action();
        log::debug!("host event {event:?}");
        match self.dispatch(event).await {
            Ok(taken) => taken,
            Err(e) => {
                self.report(action, &e);
                None
            }
        }
    }

    async fn dispatch(&self, event: HostEvent) -> Result<Option<PaneAction>> {
        match event {
            HostEvent::SelectionChanged { sheet_id, address }
            | HostEvent::SingleClicked { sheet_id, address } => {
                if self.sampler_armed.replace(false) {
                    self.sample_selection_fill().await;
                }
                self.evaluate(Some(&sheet_id), address.as_deref()).await
            }
            HostEvent::SheetActivated { sheet_id } => self.evaluate(Some(&sheet_id), None).await,
            HostEvent::SheetAdded { sheet_id } => {
                self.watcher.instrument_sheet(&self.host, &sheet_id).await?;
                Ok(None)
            }
            HostEvent::SheetDeleted { sheet_id } => {
                self.watcher.forget_sheet(&self.host, &sheet_id).await;
                Ok(None)
            }
            HostEvent::PaneVisibilityChanged { visible } => {
                self.debouncer.borrow_mut().sync_visibility(visible);
                Ok(None)
            }
        }
    }

    /// Evaluate a selection against the trigger and open or close the pane.
    ///
    /// `address` may be sheet-qualified; an unqualified one is taken to be on
    /// the sheet of the current selection. `None` uses the current selection.
    pub async fn evaluate_selection(&self, address: Option<&str>) -> Option<PaneAction> {
        match self.evaluate(None, address).await {
            Ok(taken) => taken,
            Err(e) => {
                self.report("evaluateSelection", &e);
                None
            }
        }
    }

    async fn evaluate(
        &self,
        sheet_id: Option<&str>,
        address: Option<&str>,
    ) -> Result<Option<PaneAction>> {
        let seq = self.issued.get() + 1;
        self.issued.set(seq);

        let selection = self.selection_address(sheet_id, address).await?;
        let trigger = TriggerResolver::new(&self.config.trigger)
            .resolve(&self.host)
            .await?;
        let hit = match &trigger {
            Some(target) => intersects(&self.host, &selection, target).await?,
            None => false,
        };

        if self.issued.get() != seq {
            log::warn!("discarding stale evaluation of {selection}");
            return Ok(None);
        }

        // Committed before the host call so an evaluation that starts while
        // it is pending decides from this outcome.
        let now = self.host.now_ms();
        let (action, previous, committed) = {
            let mut debouncer = self.debouncer.borrow_mut();
            let previous = debouncer.state();
            let Some(action) = debouncer.evaluate(hit, now) else {
                return Ok(None);
            };
            (action, previous, debouncer.state())
        };
        let sent = match action {
            PaneAction::Show => self.host.show_pane().await,
            PaneAction::Hide => self.host.hide_pane().await,
        };
        if let Err(e) = sent {
            if !self.debouncer.borrow_mut().rollback(committed, previous) {
                log::debug!("{action:?} failed after a newer decision; state kept");
            }
            return Err(e);
        }
        log::info!("{action:?} pane for selection {selection}");
        Ok(Some(action))
    }

    async fn selection_address(
        &self,
        sheet_id: Option<&str>,
        address: Option<&str>,
    ) -> Result<Address> {
        let Some(raw) = address.map(str::trim).filter(|a| !a.is_empty()) else {
            let current = self.host.selected_address().await?;
            return Ok(parse_qualified_address(&current));
        };

        let parsed = parse_qualified_address(raw);
        if parsed.has_sheet() {
            return Ok(parsed);
        }
        let sheet = match sheet_id {
            Some(id) => self.host.sheet_name(id).await?,
            None => parse_qualified_address(&self.host.selected_address().await?).sheet_name,
        };
        Ok(parsed.qualified_with(&sheet))
    }

    /// Push a color to the recent list and return the stored list.
    /// Invalid colors are ignored.
    pub async fn push_color(&self, value: &str) -> Vec<String> {
        match self.store.push(&self.host, value).await {
            Ok(list) => list,
            Err(e) => {
                self.report("pushColor", &e);
                self.store.cached()
            }
        }
    }

    /// Recent colors as persisted, falling back to the cache on failure.
    pub async fn get_recent_colors(&self) -> Vec<String> {
        match self.store.read(&self.host).await {
            Ok(list) => list,
            Err(e) => {
                self.report("getRecentColors", &e);
                self.store.cached()
            }
        }
    }

    /// Apply `value` to the selected targets and remember it. Returns the
    /// updated recent list, or `None` when the action failed (reported).
    pub async fn apply_color(&self, value: &str, targets: ColorTargets) -> Option<Vec<String>> {
        match self.try_apply_color(value, targets).await {
            Ok(list) => Some(list),
            Err(e) => {
                self.report("applyColor", &e);
                None
            }
        }
    }

    async fn try_apply_color(&self, value: &str, targets: ColorTargets) -> Result<Vec<String>> {
        let color = normalize_hex_color(value).ok_or_else(|| {
            XlpaneError::InvalidInput("Enter a valid hex color like #FFAA33".into())
        })?;
        if !targets.any() {
            return Err(XlpaneError::InvalidInput(
                "Choose at least one target (Fill, Font, Borders).".into(),
            ));
        }
        self.host.format_selection(&color, targets).await?;
        self.store.push(&self.host, &color).await
    }

    /// Normalized fill or font color of the selection.
    pub async fn read_selection_color(&self, source: ColorSource) -> Option<String> {
        match self.host.selection_color(source).await {
            Ok(raw) => raw.as_deref().and_then(normalize_hex_color),
            Err(e) => {
                self.report("readSelectionColor", &e);
                None
            }
        }
    }

    /// Remove fill and font color from the selection.
    pub async fn clear_selection_format(&self) -> bool {
        self.run_action("clearSelectionFormat", self.host.clear_selection_format())
            .await
    }

    /// Ribbon command: open the pane by hand. This is not a trigger open, so
    /// leaving the trigger will not close it.
    pub async fn show_taskpane(&self) -> bool {
        self.run_action("showTaskpane", self.host.show_pane()).await
    }

    /// Ribbon command: fill the selection with the quick-fill color.
    pub async fn quick_fill(&self) -> bool {
        self.run_action(
            "quickFill",
            self.host.format_selection(QUICK_FILL_COLOR, ColorTargets::FILL),
        )
        .await
    }

    /// Sample the fill of the next selected cell into the recent list.
    pub fn sample_next_selection(&self) {
        self.sampler_armed.set(true);
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler_armed.get()
    }

    async fn sample_selection_fill(&self) {
        let sampled = match self.host.selection_color(ColorSource::Fill).await {
            Ok(raw) => raw.as_deref().and_then(normalize_hex_color),
            Err(e) => {
                self.report("eyedropperCell", &e);
                return;
            }
        };
        match sampled {
            Some(color) => {
                log::info!("sampled {color}");
                if let Err(e) = self.store.push(&self.host, &color).await {
                    self.report("eyedropperCell", &e);
                }
            }
            None => log::info!("no fill on the sampled cell"),
        }
    }

    async fn run_action(&self, action: &str, call: impl Future<Output = Result<()>>) -> bool {
        match call.await {
            Ok(()) => true,
            Err(e) => {
                self.report(action, &e);
                false
            }
        }
    }

    fn report(&self, action: &str, err: &XlpaneError) {
        if err.is_host_failure() {
            log::error!("{action} failed: {err}");
        } else {
            log::warn!("{action} rejected: {err}");
        }
        self.host.report_error(action, &err.user_message());
    }
}
