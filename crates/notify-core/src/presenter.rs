//! Notification panel views
//!
//! The panel shows exactly one of three views. Each transition builds a fresh
//! [`Presentation`], hands it to the [`Shell`] for rendering and requests the
//! matching panel size.
//!
//! | View     | Size (h × w)             | Shows panel |
//! |----------|--------------------------|-------------|
//! | Dialer   | 360 × 250                | no          |
//! | CallInfo | computed by enrichment   | yes         |
//! | Error    | 250 × 270                | yes         |

use std::sync::Arc;

use tracing::{debug, info};

use crate::directory::{TicketId, UserId};
use crate::shell::{RecordKind, Shell};
use crate::stream::CallId;

pub const DIALER_HEIGHT: u32 = 360;
pub const DIALER_WIDTH: u32 = 250;
pub const ERROR_HEIGHT: u32 = 250;
pub const ERROR_WIDTH: u32 = 270;

pub const CALL_INFO_HEIGHT: u32 = 165;
pub const CALL_INFO_WIDTH: u32 = 350;
pub const TICKET_BLOCK_HEIGHT: u32 = 135;
pub const ANALYTICS_ROW_HEIGHT: u32 = 13;
pub const ANALYTICS_WIDTH: u32 = 450;

/// Avatar shown when the contact has no photo or is unknown
pub const DEFAULT_AVATAR: &str = "user-avatar.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dialer,
    CallInfo,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionIcon {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHeader {
    pub icon: DirectionIcon,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactBlock {
    /// Directory id; `None` when the caller is unknown
    pub contact_id: Option<UserId>,
    /// Contact name, or the bare phone number
    pub display_name: String,
    pub avatar_url: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketBlock {
    pub id: TicketId,
    pub subject: String,
    /// Assignee name, or the group name for unassigned tickets
    pub assignee: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsField {
    OuterNumber,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmTerm,
    UtmContent,
    Referer,
    Ip,
    GoogleId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsRow {
    pub field: AnalyticsField,
    pub value: String,
}

/// Everything the CallInfo view displays for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationDescriptor {
    pub call_id: CallId,
    pub height: u32,
    pub width: u32,
    pub header: CallHeader,
    pub contact: ContactBlock,
    pub ticket: Option<TicketBlock>,
    /// Present only when at least one analytics field is set
    pub analytics: Option<Vec<AnalyticsRow>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLink {
    pub url: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub message: String,
    pub link: Option<ErrorLink>,
    /// Whether the OK button is shown
    pub dismissible: bool,
}

/// What the shell is asked to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Dialer,
    CallInfo(PresentationDescriptor),
    Error(ErrorDescriptor),
}

impl Presentation {
    pub fn view(&self) -> View {
        match self {
            Presentation::Dialer => View::Dialer,
            Presentation::CallInfo(_) => View::CallInfo,
            Presentation::Error(_) => View::Error,
        }
    }

    /// Panel size as (height, width)
    pub fn size(&self) -> (u32, u32) {
        match self {
            Presentation::Dialer => (DIALER_HEIGHT, DIALER_WIDTH),
            Presentation::CallInfo(descriptor) => (descriptor.height, descriptor.width),
            Presentation::Error(_) => (ERROR_HEIGHT, ERROR_WIDTH),
        }
    }
}

/// Three-state view machine driving the host shell
pub struct NotificationPresenter {
    shell: Arc<dyn Shell>,
    current: Presentation,
    latched_error: Option<ErrorDescriptor>,
}

impl std::fmt::Debug for NotificationPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPresenter")
            .field("current", &self.current)
            .field("latched_error", &self.latched_error)
            .finish()
    }
}

impl NotificationPresenter {
    /// Create a presenter; nothing is rendered until the first transition
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self {
            shell,
            current: Presentation::Dialer,
            latched_error: None,
        }
    }

    pub fn view(&self) -> View {
        self.current.view()
    }

    pub fn current(&self) -> &Presentation {
        &self.current
    }

    pub fn latched_error(&self) -> Option<&ErrorDescriptor> {
        self.latched_error.as_ref()
    }

    pub fn show_dialer(&mut self) {
        self.transition(Presentation::Dialer, false);
    }

    pub fn show_call_info(&mut self, descriptor: PresentationDescriptor) {
        debug!(call_id = %descriptor.call_id, height = descriptor.height, width = descriptor.width, "showing call info");
        self.transition(Presentation::CallInfo(descriptor), true);
    }

    pub fn show_error(&mut self, error: ErrorDescriptor) {
        info!(message = %error.message, "showing error");
        self.transition(Presentation::Error(error), true);
    }

    /// Show an error that must come back whenever the panel is activated
    pub fn latch_error(&mut self, error: ErrorDescriptor) {
        self.latched_error = Some(error.clone());
        self.show_error(error);
    }

    pub fn hide(&self) {
        self.shell.set_visible(false);
    }

    /// Re-show the latched error, if any
    pub fn on_pane_activated(&mut self) {
        if let Some(error) = self.latched_error.clone() {
            self.show_error(error);
        }
    }

    /// OK pressed on the error view
    pub fn dismiss_error(&mut self) {
        if self.view() == View::Error {
            self.show_dialer();
        }
    }

    /// Follow the contact or ticket link of the displayed call
    pub fn navigate(&self, kind: RecordKind) {
        let Presentation::CallInfo(descriptor) = &self.current else {
            debug!(%kind, "navigation requested outside call info view");
            return;
        };
        let target = match kind {
            RecordKind::User => descriptor.contact.contact_id,
            RecordKind::Ticket => descriptor.ticket.as_ref().map(|ticket| ticket.id),
        };
        match target {
            Some(id) => self.shell.navigate_to(kind, id),
            None => debug!(%kind, "no record to navigate to"),
        }
    }

    fn transition(&mut self, presentation: Presentation, make_visible: bool) {
        let (height, width) = presentation.size();
        self.shell.render(&presentation);
        self.shell.resize(height, width);
        if make_visible {
            self.shell.set_visible(true);
        }
        self.current = presentation;
    }
}
