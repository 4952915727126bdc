//! Shell that renders the panel into the log

use callnotify_core::presenter::{PresentationDescriptor, View};
use callnotify_core::{Presentation, RecordKind, Shell};
use tracing::info;

#[derive(Debug, Default)]
pub struct LogShell {
    /// Base URL used to print navigation targets
    agent_url: Option<String>,
}

impl LogShell {
    pub fn new(agent_url: Option<String>) -> Self {
        Self { agent_url }
    }

    fn render_call(descriptor: &PresentationDescriptor) {
        info!(
            call_id = %descriptor.call_id,
            kind = %descriptor.header.label,
            direction = ?descriptor.header.icon,
            "call: {}",
            descriptor.contact.display_name
        );
        if let Some(notes) = &descriptor.contact.notes {
            info!("  notes: {}", notes);
        }
        if let Some(ticket) = &descriptor.ticket {
            info!(
                ticket_id = ticket.id,
                assignee = ticket.assignee.as_deref().unwrap_or("-"),
                "  ticket: {}",
                ticket.subject
            );
            if !ticket.description.is_empty() {
                info!("  {}", ticket.description);
            }
        }
        for row in descriptor.analytics.iter().flatten() {
            info!("  {:?}: {}", row.field, row.value);
        }
    }
}

impl Shell for LogShell {
    fn render(&self, presentation: &Presentation) {
        match presentation {
            Presentation::Dialer => info!(view = ?View::Dialer, "dialer ready"),
            Presentation::CallInfo(descriptor) => Self::render_call(descriptor),
            Presentation::Error(error) => {
                info!(dismissible = error.dismissible, "error: {}", error.message);
                if let Some(link) = &error.link {
                    info!("  {} {}", link.label.as_deref().unwrap_or(""), link.url);
                }
            }
        }
    }

    fn resize(&self, height: u32, width: u32) {
        tracing::debug!(height, width, "panel resized");
    }

    fn set_visible(&self, visible: bool) {
        info!(visible, "panel visibility");
    }

    fn navigate_to(&self, kind: RecordKind, id: u64) {
        let path = match kind {
            RecordKind::User => "users",
            RecordKind::Ticket => "tickets",
        };
        match &self.agent_url {
            Some(base) => info!("open {}/agent/{}/{}", base.trim_end_matches('/'), path, id),
            None => info!(%kind, id, "open record"),
        }
    }
}
