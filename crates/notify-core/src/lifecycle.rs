//! Call display lifecycle
//!
//! Tracks the single call currently shown to the operator and decides what
//! each call event means for the panel. Every terminal transition and every
//! timer is checked against the open call id, so a late event or an old timer
//! can never touch a newer call.
//!
//! ```text
//!            DialStart/Answered(c)            Answered phase
//!   Idle ───────────────────────────▶ Displaying(c) ──────────▶ AutoHideScheduled(c)
//!    ▲                                   │  ▲                          │
//!    │          DialEnd(c)               │  └── new call (any state) ──┤
//!    └───────────────────────────────────┘                             │
//!    └──────────────── hide timer for c, c still open ─────────────────┘
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::stream::{CallDirection, CallId, CallPayload};

/// Ended call ids remembered to reject late answers
const ENDED_WINDOW: usize = 32;

/// Handle of a scheduled auto-hide. Only the most recently issued handle for
/// the open call is honored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HideTimer {
    call_id: CallId,
    generation: u64,
}

impl HideTimer {
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }
}

/// Handle of one display of a call. Each call event issues a new one, and
/// only the latest may render, so an older lookup for the same call cannot
/// overwrite a newer one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayToken {
    call_id: CallId,
    generation: u64,
}

impl DisplayToken {
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }
}

/// Observable lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Displaying(CallId),
    AutoHideScheduled(CallId),
}

/// Why an event had no visible effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Operator-to-operator calls are not surfaced
    Internal,
    /// The event names a call other than the open one
    StaleCall,
    /// The call already ended; a late answer must not re-open it
    AlreadyEnded,
    /// Nothing is open
    NothingOpen,
}

/// Outcome of a call event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallDecision {
    /// The call is now open: enrich and render it under `token`. If
    /// `auto_hide` is set, arm that timer.
    Display {
        token: DisplayToken,
        auto_hide: Option<HideTimer>,
    },
    /// Hide the panel now
    Hide { call_id: CallId },
    Ignore(IgnoreReason),
}

#[derive(Debug, Default)]
struct CallDisplayState {
    open_call: Option<CallId>,
    latest_display: Option<DisplayToken>,
    pending_hide: Option<HideTimer>,
}

/// Single source of truth for "which call is shown"
#[derive(Debug, Default)]
pub struct CallLifecycle {
    display: CallDisplayState,
    next_generation: u64,
    ended: VecDeque<CallId>,
}

impl CallLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        match (&self.display.open_call, &self.display.pending_hide) {
            (None, _) => LifecycleState::Idle,
            (Some(id), Some(_)) => LifecycleState::AutoHideScheduled(id.clone()),
            (Some(id), None) => LifecycleState::Displaying(id.clone()),
        }
    }

    pub fn open_call(&self) -> Option<&CallId> {
        self.display.open_call.as_ref()
    }

    pub fn is_open(&self, call_id: &CallId) -> bool {
        self.display.open_call.as_ref() == Some(call_id)
    }

    /// True if `token` is the most recent display of the open call
    pub fn is_current(&self, token: &DisplayToken) -> bool {
        self.is_open(&token.call_id) && self.display.latest_display.as_ref() == Some(token)
    }

    pub fn is_idle(&self) -> bool {
        self.display.open_call.is_none()
    }

    /// `dialStart` or `answeredCall`: the newest call always wins
    pub fn on_call(&mut self, call: &CallPayload) -> CallDecision {
        if call.direction == CallDirection::Internal {
            debug!(call_id = %call.call_id, "internal call, not displayed");
            return CallDecision::Ignore(IgnoreReason::Internal);
        }
        if !self.is_open(&call.call_id) && self.ended.contains(&call.call_id) {
            debug!(call_id = %call.call_id, "event for an ended call ignored");
            return CallDecision::Ignore(IgnoreReason::AlreadyEnded);
        }

        let same_call = self.is_open(&call.call_id);
        self.display.open_call = Some(call.call_id.clone());

        let auto_hide = if call.is_answered() {
            let timer = self.issue_timer(&call.call_id);
            self.display.pending_hide = Some(timer.clone());
            Some(timer)
        } else {
            if !same_call {
                self.display.pending_hide = None;
            }
            None
        };

        self.next_generation += 1;
        let token = DisplayToken {
            call_id: call.call_id.clone(),
            generation: self.next_generation,
        };
        self.display.latest_display = Some(token.clone());

        CallDecision::Display { token, auto_hide }
    }

    /// `dialEnd`: hides only the call it names
    pub fn on_dial_end(&mut self, call_id: &CallId) -> CallDecision {
        self.remember_ended(call_id);

        match &self.display.open_call {
            Some(open) if open == call_id => {
                self.display = CallDisplayState::default();
                CallDecision::Hide {
                    call_id: call_id.clone(),
                }
            }
            Some(open) => {
                debug!(ended = %call_id, open = %open, "stale dialEnd ignored");
                CallDecision::Ignore(IgnoreReason::StaleCall)
            }
            None => CallDecision::Ignore(IgnoreReason::NothingOpen),
        }
    }

    /// A hide timer expired. Returns true if the panel should hide.
    pub fn on_hide_timer(&mut self, timer: &HideTimer) -> bool {
        let current = self.display.pending_hide.as_ref() == Some(timer)
            && self.is_open(&timer.call_id);
        if current {
            self.display = CallDisplayState::default();
        } else {
            debug!(call_id = %timer.call_id, "superseded hide timer ignored");
        }
        current
    }

    fn issue_timer(&mut self, call_id: &CallId) -> HideTimer {
        self.next_generation += 1;
        HideTimer {
            call_id: call_id.clone(),
            generation: self.next_generation,
        }
    }

    fn remember_ended(&mut self, call_id: &CallId) {
        if self.ended.contains(call_id) {
            return;
        }
        if self.ended.len() == ENDED_WINDOW {
            self.ended.pop_front();
        }
        self.ended.push_back(call_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::CallPhase;
    use tracing_test::traced_test;

    fn call(id: &str, direction: CallDirection, answered: bool) -> CallPayload {
        let mut call = CallPayload::new(CallId::new(id), direction, "REGULAR");
        if answered {
            call.call_phase = CallPhase::Answered;
        }
        call
    }

    #[test]
    fn test_dial_start_opens_call() {
        let mut lifecycle = CallLifecycle::new();
        let decision = lifecycle.on_call(&call("c1", CallDirection::Inbound, false));

        let CallDecision::Display {
            token,
            auto_hide: None,
        } = decision
        else {
            panic!("unexpected {:?}", decision);
        };
        assert_eq!(token.call_id(), &CallId::new("c1"));
        assert!(lifecycle.is_current(&token));
        assert_eq!(lifecycle.state(), LifecycleState::Displaying(CallId::new("c1")));
    }

    #[test]
    fn test_internal_call_leaves_state_untouched() {
        let mut lifecycle = CallLifecycle::new();
        lifecycle.on_call(&call("c1", CallDirection::Outbound, false));

        let decision = lifecycle.on_call(&call("c2", CallDirection::Internal, false));
        assert_eq!(decision, CallDecision::Ignore(IgnoreReason::Internal));
        assert!(lifecycle.is_open(&CallId::new("c1")));

        // The shown call still ends on its own dialEnd.
        assert_eq!(
            lifecycle.on_dial_end(&CallId::new("c1")),
            CallDecision::Hide {
                call_id: CallId::new("c1")
            }
        );
        assert!(lifecycle.is_idle());
    }

    #[test]
    fn test_dial_end_for_other_call_is_ignored() {
        let mut lifecycle = CallLifecycle::new();
        lifecycle.on_call(&call("c2", CallDirection::Inbound, false));

        let decision = lifecycle.on_dial_end(&CallId::new("c1"));
        assert_eq!(decision, CallDecision::Ignore(IgnoreReason::StaleCall));
        assert_eq!(lifecycle.state(), LifecycleState::Displaying(CallId::new("c2")));
    }

    #[test]
    #[traced_test]
    fn test_stale_dial_end_is_logged() {
        let mut lifecycle = CallLifecycle::new();
        lifecycle.on_call(&call("c2", CallDirection::Inbound, false));
        lifecycle.on_dial_end(&CallId::new("c1"));

        assert!(logs_contain("stale dialEnd ignored"));
    }

    #[test]
    fn test_dial_end_hides_open_call() {
        let mut lifecycle = CallLifecycle::new();
        lifecycle.on_call(&call("c1", CallDirection::Inbound, false));

        assert_eq!(
            lifecycle.on_dial_end(&CallId::new("c1")),
            CallDecision::Hide {
                call_id: CallId::new("c1")
            }
        );
        assert_eq!(lifecycle.state(), LifecycleState::Idle);
        assert_eq!(
            lifecycle.on_dial_end(&CallId::new("c1")),
            CallDecision::Ignore(IgnoreReason::NothingOpen)
        );
    }

    #[test]
    fn test_answered_call_schedules_hide() {
        let mut lifecycle = CallLifecycle::new();
        let CallDecision::Display {
            auto_hide: Some(timer),
            ..
        } = lifecycle.on_call(&call("c1", CallDirection::Inbound, true))
        else {
            panic!("expected a hide timer");
        };

        assert_eq!(
            lifecycle.state(),
            LifecycleState::AutoHideScheduled(CallId::new("c1"))
        );
        assert!(lifecycle.on_hide_timer(&timer));
        assert!(lifecycle.is_idle());
        assert!(!lifecycle.on_hide_timer(&timer));
    }

    #[test]
    fn test_superseded_timer_does_not_hide_new_call() {
        let mut lifecycle = CallLifecycle::new();
        let CallDecision::Display {
            auto_hide: Some(timer),
            ..
        } = lifecycle.on_call(&call("c1", CallDirection::Inbound, true))
        else {
            panic!("expected a hide timer");
        };

        lifecycle.on_call(&call("c2", CallDirection::Inbound, false));
        assert!(!lifecycle.on_hide_timer(&timer));
        assert_eq!(lifecycle.state(), LifecycleState::Displaying(CallId::new("c2")));
    }

    #[test]
    fn test_repeated_answer_keeps_only_latest_timer() {
        let mut lifecycle = CallLifecycle::new();
        let first = match lifecycle.on_call(&call("c1", CallDirection::Inbound, true)) {
            CallDecision::Display { auto_hide: Some(timer), .. } => timer,
            other => panic!("unexpected {:?}", other),
        };
        let second = match lifecycle.on_call(&call("c1", CallDirection::Inbound, true)) {
            CallDecision::Display { auto_hide: Some(timer), .. } => timer,
            other => panic!("unexpected {:?}", other),
        };

        assert!(!lifecycle.on_hide_timer(&first));
        assert!(lifecycle.on_hide_timer(&second));
    }

    #[test]
    fn test_repeated_event_supersedes_earlier_display() {
        let mut lifecycle = CallLifecycle::new();
        let display = |decision: CallDecision| match decision {
            CallDecision::Display { token, .. } => token,
            other => panic!("unexpected {:?}", other),
        };
        let started = display(lifecycle.on_call(&call("c1", CallDirection::Inbound, false)));
        let answered = display(lifecycle.on_call(&call("c1", CallDirection::Inbound, true)));

        assert_eq!(started.call_id(), answered.call_id());
        assert!(!lifecycle.is_current(&started));
        assert!(lifecycle.is_current(&answered));

        lifecycle.on_dial_end(&CallId::new("c1"));
        assert!(!lifecycle.is_current(&answered));
    }

    #[test]
    fn test_late_answer_for_ended_call_is_ignored() {
        let mut lifecycle = CallLifecycle::new();
        lifecycle.on_call(&call("c1", CallDirection::Inbound, false));
        lifecycle.on_dial_end(&CallId::new("c1"));

        assert_eq!(
            lifecycle.on_call(&call("c1", CallDirection::Inbound, true)),
            CallDecision::Ignore(IgnoreReason::AlreadyEnded)
        );
        assert!(lifecycle.is_idle());
    }

    #[test]
    fn test_ended_window_is_bounded() {
        let mut lifecycle = CallLifecycle::new();
        for n in 0..(ENDED_WINDOW + 1) {
            lifecycle.on_dial_end(&CallId::new(n.to_string()));
        }

        // The oldest id fell out of the window and may be shown again.
        assert!(matches!(
            lifecycle.on_call(&call("0", CallDirection::Inbound, false)),
            CallDecision::Display { .. }
        ));
    }
}
