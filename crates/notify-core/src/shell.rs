//! Host application boundary
//!
//! The host embeds the notification panel: it supplies the operator's
//! identity, draws whatever the presenter renders, and forwards operator
//! actions back as [`HostEvent`]s.

use std::fmt;

use crate::presenter::Presentation;

/// Identity supplied by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    pub current_user_id: String,
    pub account_subdomain: String,
}

/// Record types the host can navigate to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    User,
    Ticket,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::User => f.write_str("user"),
            RecordKind::Ticket => f.write_str("ticket"),
        }
    }
}

/// Operator and host actions consumed by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Place an outbound call (host dial-out or the dialer's call button)
    DialOut(String),
    /// The panel regained focus
    PaneActivated,
    /// The operator pressed OK on an error
    ErrorDismissed,
    /// The operator clicked the contact name or ticket subject
    Navigate(RecordKind),
}

/// Invocations the host must support. Calls are fire-and-forget.
pub trait Shell: Send + Sync {
    fn render(&self, presentation: &Presentation);

    fn resize(&self, height: u32, width: u32);

    fn set_visible(&self, visible: bool);

    fn navigate_to(&self, kind: RecordKind, id: u64);
}
