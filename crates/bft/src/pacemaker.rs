//! Pacemaker: view timing and round advancement.
//!
//! The pacemaker bounds how long the state machine waits in a view before
//! forcing a view change. It owns the node's single view timer: arming a new
//! deadline replaces the previous one, and a fire for an older view can
//! never advance a newer one (the armed view is recorded and compared on
//! fire).
//!
//! In manual mode no timers are armed and autonomous fires are ignored;
//! view advancement happens only through an explicit external trigger. This
//! removes all wall-clock dependency for deterministic testing and
//! debugging.

use palisade_core::{Action, TimerId};
use palisade_types::View;
use std::time::Duration;
use tracing::{debug, info};

/// View-timeout controller.
#[derive(Debug)]
pub struct Pacemaker {
    /// The view the node is currently in.
    view: View,

    /// The view the active timer was armed for. `None` when no timer is
    /// conceptually outstanding (manual mode, or just advanced).
    armed_for: Option<View>,

    /// Base timeout; doubles per round at the same height.
    base_timeout: Duration,

    /// Cap for the exponential backoff.
    max_backoff_exponent: u32,

    /// Manual mode: timers never fire autonomously.
    manual: bool,
}

impl Pacemaker {
    /// Create a pacemaker at view (0, 0).
    pub fn new(base_timeout: Duration, max_backoff_exponent: u32, manual: bool) -> Self {
        Self {
            view: View::new(0, 0),
            armed_for: None,
            base_timeout,
            max_backoff_exponent,
            manual,
        }
    }

    /// The current view.
    pub fn view(&self) -> View {
        self.view
    }

    /// Whether manual mode is active.
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    /// The timeout for the current view, with exponential backoff per round.
    pub fn current_timeout(&self) -> Duration {
        let exponent = (self.view.round as u32).min(self.max_backoff_exponent);
        self.base_timeout * 2u32.pow(exponent)
    }

    /// Enter `view` and arm its deadline.
    ///
    /// Replaces (never stacks) any previously armed timer.
    pub fn start(&mut self, view: View) -> Vec<Action> {
        self.view = view;

        if self.manual {
            self.armed_for = None;
            return vec![];
        }

        self.armed_for = Some(view);
        vec![Action::SetTimer {
            id: TimerId::View,
            duration: self.current_timeout(),
        }]
    }

    /// Handle a view-timer fire.
    ///
    /// Returns the advanced view, or `None` when the fire is stale (armed
    /// for an older view) or the pacemaker is in manual mode.
    pub fn on_timer_fired(&mut self) -> Option<View> {
        if self.manual {
            debug!("Ignoring view timer in manual mode");
            return None;
        }

        if self.armed_for != Some(self.view) {
            debug!(
                armed = ?self.armed_for,
                current = %self.view,
                "Ignoring stale view timer"
            );
            return None;
        }

        self.armed_for = None;
        self.view = self.view.next_round();
        info!(view = %self.view, "View timeout, advancing round");
        Some(self.view)
    }

    /// Explicit external advancement (debug `TriggerNextView`).
    ///
    /// Works in both modes; this is the only way views advance in manual
    /// mode.
    pub fn manual_advance(&mut self) -> View {
        self.armed_for = None;
        self.view = self.view.next_round();
        info!(view = %self.view, "Manual view advance");
        self.view
    }

    /// Adopt a later view at the same height (observed round advancement).
    ///
    /// Returns rearm actions if `view` is ahead of the current view;
    /// older or equal views are ignored.
    pub fn catch_up(&mut self, view: View) -> Option<Vec<Action>> {
        if view.height == self.view.height && view > self.view {
            debug!(from = %self.view, to = %view, "Pacemaker catching up");
            Some(self.start(view))
        } else {
            None
        }
    }

    /// Toggle manual mode. Returns the actions to reconcile the timer with
    /// the new mode and the mode now in effect.
    pub fn toggle_manual(&mut self) -> (bool, Vec<Action>) {
        self.manual = !self.manual;
        info!(manual = self.manual, "Toggled pacemaker manual mode");

        let actions = if self.manual {
            self.armed_for = None;
            vec![Action::CancelTimer { id: TimerId::View }]
        } else {
            self.start(self.view)
        };
        (self.manual, actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacemaker(manual: bool) -> Pacemaker {
        Pacemaker::new(Duration::from_secs(5), 6, manual)
    }

    #[test]
    fn test_start_arms_timer() {
        let mut pm = pacemaker(false);
        let actions = pm.start(View::new(1, 0));
        assert!(matches!(
            actions[0],
            Action::SetTimer {
                id: TimerId::View,
                duration
            } if duration == Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_timeout_advances_round() {
        let mut pm = pacemaker(false);
        pm.start(View::new(1, 0));
        assert_eq!(pm.on_timer_fired(), Some(View::new(1, 1)));
    }

    #[test]
    fn test_stale_fire_is_ignored() {
        let mut pm = pacemaker(false);
        pm.start(View::new(1, 0));
        // A newer view was started before the old fire was delivered.
        pm.start(View::new(2, 0));
        pm.view = View::new(2, 0);
        assert_eq!(pm.on_timer_fired(), Some(View::new(2, 1)));

        // armed_for was consumed; a queued duplicate fire cannot advance again.
        assert_eq!(pm.on_timer_fired(), None);
    }

    #[test]
    fn test_manual_mode_never_fires() {
        let mut pm = pacemaker(true);
        assert!(pm.start(View::new(1, 0)).is_empty());
        assert_eq!(pm.on_timer_fired(), None);
        // Explicit trigger is the only way forward.
        assert_eq!(pm.manual_advance(), View::new(1, 1));
    }

    #[test]
    fn test_manual_advance_is_deterministic() {
        let mut pm = pacemaker(true);
        pm.start(View::new(1, 0));
        for round in 1..=10 {
            assert_eq!(pm.manual_advance(), View::new(1, round));
        }
    }

    #[test]
    fn test_backoff_doubles_per_round_and_caps() {
        let mut pm = pacemaker(false);
        let base = Duration::from_secs(5);

        pm.start(View::new(1, 0));
        assert_eq!(pm.current_timeout(), base);
        pm.start(View::new(1, 3));
        assert_eq!(pm.current_timeout(), base * 8);
        pm.start(View::new(1, 10));
        assert_eq!(pm.current_timeout(), base * 64);

        // Round resets on height advance, so backoff does too.
        pm.start(View::new(2, 0));
        assert_eq!(pm.current_timeout(), base);
    }

    #[test]
    fn test_toggle_manual_cancels_timer() {
        let mut pm = pacemaker(false);
        pm.start(View::new(1, 0));
        let (manual, actions) = pm.toggle_manual();
        assert!(manual);
        assert!(matches!(actions[0], Action::CancelTimer { id: TimerId::View }));

        // Toggling back re-arms.
        let (manual, actions) = pm.toggle_manual();
        assert!(!manual);
        assert!(matches!(actions[0], Action::SetTimer { .. }));
    }

    #[test]
    fn test_catch_up_only_moves_forward() {
        let mut pm = pacemaker(false);
        pm.start(View::new(3, 1));
        assert!(pm.catch_up(View::new(3, 0)).is_none());
        assert!(pm.catch_up(View::new(3, 1)).is_none());
        assert!(pm.catch_up(View::new(4, 0)).is_none());
        assert!(pm.catch_up(View::new(3, 2)).is_some());
        assert_eq!(pm.view(), View::new(3, 2));
    }
}
