//! Debounced open/close decisions for the task pane.
//!
//! Only the open transition is debounced: the pane must not flicker while a
//! selection is dragged across the trigger, but it closes as soon as the
//! selection leaves it.

use serde::Serialize;

/// Minimum time between two automatic opens when none is configured.
pub const DEFAULT_MIN_OPEN_INTERVAL_MS: f64 = 750.0;

/// What the controller should ask the host to do with the pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PaneAction {
    Show,
    Hide,
}

/// Session-scoped pane state, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityState {
    /// The pane is open because the selection hit the trigger.
    pub opened_by_trigger: bool,
    /// Time of the last automatic open; `None` until the first one.
    pub last_open_at_ms: Option<f64>,
}

impl VisibilityState {
    pub fn last_open_at_ms(&self) -> f64 {
        self.last_open_at_ms.unwrap_or(0.0)
    }
}

/// Two-state machine: `Closed` and `OpenedByTrigger`.
#[derive(Debug, Clone)]
pub struct VisibilityDebouncer {
    state: VisibilityState,
    min_interval_ms: f64,
}

impl VisibilityDebouncer {
    pub fn new(min_interval_ms: f64) -> Self {
        Self {
            state: VisibilityState::default(),
            min_interval_ms: min_interval_ms.max(0.0),
        }
    }

    pub fn state(&self) -> VisibilityState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.opened_by_trigger
    }

    /// Decide without mutating state.
    pub fn decide(&self, intersects: bool, now_ms: f64) -> Option<PaneAction> {
        match (self.state.opened_by_trigger, intersects) {
            (false, true) => {
                let elapsed_ok = self
                    .state
                    .last_open_at_ms
                    .map_or(true, |last| now_ms - last >= self.min_interval_ms);
                elapsed_ok.then_some(PaneAction::Show)
            }
            (true, false) => Some(PaneAction::Hide),
            (true, true) | (false, false) => None,
        }
    }

    /// Record that `action` was carried out at `now_ms`.
    pub fn commit(&mut self, action: PaneAction, now_ms: f64) {
        match action {
            PaneAction::Show => {
                self.state.opened_by_trigger = true;
                self.state.last_open_at_ms = Some(now_ms);
            }
            PaneAction::Hide => self.state.opened_by_trigger = false,
        }
    }

    /// Decide and commit in one step.
    pub fn evaluate(&mut self, intersects: bool, now_ms: f64) -> Option<PaneAction> {
        let action = self.decide(intersects, now_ms)?;
        self.commit(action, now_ms);
        Some(action)
    }

    /// Undo a commit whose host call failed. A newer commit made meanwhile
    /// wins, so this only restores `previous` while `committed` is current.
    pub fn rollback(&mut self, committed: VisibilityState, previous: VisibilityState) -> bool {
        if self.state != committed {
            return false;
        }
        self.state = previous;
        true
    }

    /// Follow a visibility change the user made directly. A pane closed by
    /// the user is no longer trigger-opened; a manual open does not make it so.
    pub fn sync_visibility(&mut self, visible: bool) {
        if !visible {
            self.state.opened_by_trigger = false;
        }
    }
}

impl Default for VisibilityDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_OPEN_INTERVAL_MS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        let d = VisibilityDebouncer::new(500.0);
        assert_eq!(d.state(), VisibilityState::default());
        assert_eq!(d.state().last_open_at_ms(), 0.0);
    }

    #[test]
    fn test_first_open_is_not_debounced() {
        let mut d = VisibilityDebouncer::new(500.0);
        assert_eq!(d.evaluate(true, 10.0), Some(PaneAction::Show));
        assert!(d.is_open());
        assert_eq!(d.state().last_open_at_ms(), 10.0);
    }

    #[test]
    fn test_rapid_hits_emit_one_show() {
        let mut d = VisibilityDebouncer::new(500.0);
        let shows = (0..20)
            .filter_map(|i| d.evaluate(true, 1_000.0 + f64::from(i) * 20.0))
            .filter(|a| *a == PaneAction::Show)
            .count();
        assert_eq!(shows, 1);
    }

    #[test]
    fn test_show_then_hide() {
        let mut d = VisibilityDebouncer::new(500.0);
        assert_eq!(d.evaluate(true, 1_000.0), Some(PaneAction::Show));
        assert_eq!(d.evaluate(false, 1_001.0), Some(PaneAction::Hide));
        assert!(!d.is_open());
    }

    #[test]
    fn test_reopen_within_interval_is_dropped() {
        let mut d = VisibilityDebouncer::new(500.0);
        d.evaluate(true, 1_000.0);
        d.evaluate(false, 1_100.0);
        assert_eq!(d.evaluate(true, 1_200.0), None);
        assert!(!d.is_open());
        // Dropped, not queued: the next eligible hit opens.
        assert_eq!(d.evaluate(true, 1_500.0), Some(PaneAction::Show));
    }

    #[test]
    fn test_closed_miss_is_noop() {
        let mut d = VisibilityDebouncer::new(500.0);
        assert_eq!(d.evaluate(false, 1_000.0), None);
        assert_eq!(d.state(), VisibilityState::default());
    }

    #[test]
    fn test_decide_does_not_mutate() {
        let d = VisibilityDebouncer::new(500.0);
        assert_eq!(d.decide(true, 1_000.0), Some(PaneAction::Show));
        assert!(!d.is_open());
    }

    #[test]
    fn test_rollback_restores_previous_state() {
        let mut d = VisibilityDebouncer::new(500.0);
        let previous = d.state();
        d.evaluate(true, 1_000.0);
        let committed = d.state();

        assert!(d.rollback(committed, previous));
        assert_eq!(d.state(), VisibilityState::default());
        // Not debounced against an open that never happened.
        assert_eq!(d.decide(true, 1_001.0), Some(PaneAction::Show));
    }

    #[test]
    fn test_rollback_keeps_newer_commit() {
        let mut d = VisibilityDebouncer::new(500.0);
        let previous = d.state();
        d.evaluate(true, 1_000.0);
        let committed = d.state();
        d.evaluate(false, 1_001.0);

        assert!(!d.rollback(committed, previous));
        assert!(!d.is_open());
        assert_eq!(d.state().last_open_at_ms, Some(1_000.0));
    }

    #[test]
    fn test_user_close_allows_reopen() {
        let mut d = VisibilityDebouncer::new(0.0);
        d.evaluate(true, 1_000.0);
        d.sync_visibility(false);
        assert!(!d.is_open());
        assert_eq!(d.evaluate(true, 1_001.0), Some(PaneAction::Show));
        d.sync_visibility(true);
        assert!(d.is_open());
    }
}
