//! Call enrichment
//!
//! Resolves a raw call into a [`PresentationDescriptor`]: who is calling, the
//! ticket they most likely call about, who owns that ticket, and the call's
//! analytics. Lookups run one after another and each may fail; a failed
//! lookup only removes the data it would have produced, the panel always
//! renders.
//!
//! # Selection rules
//!
//! - Several contacts share the number: the oldest account wins.
//! - Several tickets for the contact: solved and closed tickets are dropped,
//!   then the newest remaining ticket wins. No open ticket, no ticket block.
//!   A single search result is used as is.

pub mod analytics;
pub mod header;
pub mod phone;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::directory::{Directory, DirectoryContact, DirectoryTicket, TicketId, UserId};
use crate::presenter::{
    ContactBlock, PresentationDescriptor, TicketBlock, ANALYTICS_ROW_HEIGHT, ANALYTICS_WIDTH,
    CALL_INFO_HEIGHT, CALL_INFO_WIDTH, DEFAULT_AVATAR, TICKET_BLOCK_HEIGHT,
};
use crate::stream::CallPayload;

/// Longest ticket description shown before truncation
pub const DESCRIPTION_LIMIT: usize = 180;

/// Pick the contact with the oldest account
pub fn select_contact(candidates: Vec<DirectoryContact>) -> Option<DirectoryContact> {
    candidates.into_iter().min_by_key(|contact| contact.created_at)
}

/// Pick the ticket the caller most likely calls about
pub fn select_ticket(mut candidates: Vec<DirectoryTicket>) -> Option<DirectoryTicket> {
    if candidates.len() == 1 {
        return candidates.pop();
    }
    candidates
        .into_iter()
        .filter(|ticket| !ticket.status.is_finished())
        .reduce(|newest, ticket| {
            if ticket.created_at > newest.created_at {
                ticket
            } else {
                newest
            }
        })
}

pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_LIMIT {
        let mut truncated: String = description.chars().take(DESCRIPTION_LIMIT).collect();
        truncated.push_str("...");
        truncated
    } else {
        description.to_string()
    }
}

/// Resolves calls against the directory
#[derive(Clone)]
pub struct EnrichmentPipeline {
    directory: Arc<dyn Directory>,
}

impl EnrichmentPipeline {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Build the CallInfo view for `call`. Backend hints, when present,
    /// replace the phone and requester searches.
    pub async fn enrich(
        &self,
        call: &CallPayload,
        contact_hint: Option<UserId>,
        ticket_hint: Option<TicketId>,
    ) -> PresentationDescriptor {
        let contact = self.resolve_contact(call, contact_hint).await;

        let ticket = match &contact {
            Some(contact) => self.resolve_ticket(contact.id, ticket_hint).await,
            None => None,
        };

        let ticket_block = match ticket {
            Some(ticket) => Some(TicketBlock {
                id: ticket.id,
                assignee: self.resolve_assignee(&ticket).await,
                description: truncate_description(&ticket.description),
                subject: ticket.subject,
            }),
            None => None,
        };

        let contact_block = match contact {
            Some(contact) => ContactBlock {
                contact_id: Some(contact.id),
                display_name: contact.name,
                avatar_url: contact
                    .photo_url
                    .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
                notes: contact.notes.filter(|notes| !notes.is_empty()),
            },
            None => ContactBlock {
                contact_id: None,
                display_name: call.client_number().to_string(),
                avatar_url: DEFAULT_AVATAR.to_string(),
                notes: None,
            },
        };

        let rows = analytics::analytics_rows(call);

        let mut height = CALL_INFO_HEIGHT;
        let mut width = CALL_INFO_WIDTH;
        if ticket_block.is_some() {
            height += TICKET_BLOCK_HEIGHT;
        }
        if !rows.is_empty() {
            height += ANALYTICS_ROW_HEIGHT * rows.len() as u32;
            width = ANALYTICS_WIDTH;
        }

        PresentationDescriptor {
            call_id: call.call_id.clone(),
            height,
            width,
            header: header::call_header(call),
            contact: contact_block,
            ticket: ticket_block,
            analytics: if rows.is_empty() { None } else { Some(rows) },
        }
    }

    async fn resolve_contact(
        &self,
        call: &CallPayload,
        hint: Option<UserId>,
    ) -> Option<DirectoryContact> {
        if let Some(id) = hint {
            return match self.directory.get_user(id).await {
                Ok(contact) => Some(contact),
                Err(err) => {
                    warn!(contact_id = id, error = %err, "contact lookup failed");
                    None
                }
            };
        }

        let key = phone::search_key(call.client_number());
        if key.is_empty() {
            debug!(call_id = %call.call_id, "no number to search contacts by");
            return None;
        }
        match self.directory.search_users_by_phone(key).await {
            Ok(candidates) => {
                debug!(phone = key, matches = candidates.len(), "contact search");
                select_contact(candidates)
            }
            Err(err) => {
                warn!(phone = key, error = %err, "contact search failed");
                None
            }
        }
    }

    async fn resolve_ticket(&self, requester: UserId, hint: Option<TicketId>) -> Option<DirectoryTicket> {
        if let Some(id) = hint {
            return match self.directory.get_ticket(id).await {
                Ok(ticket) => Some(ticket),
                Err(err) => {
                    warn!(ticket_id = id, error = %err, "ticket lookup failed");
                    None
                }
            };
        }

        match self.directory.search_tickets_by_requester(requester).await {
            Ok(candidates) => select_ticket(candidates),
            Err(err) => {
                warn!(requester, error = %err, "ticket search failed");
                None
            }
        }
    }

    async fn resolve_assignee(&self, ticket: &DirectoryTicket) -> Option<String> {
        if let Some(assignee) = ticket.assignee_id {
            return match self.directory.get_user(assignee).await {
                Ok(user) => Some(user.name),
                Err(err) => {
                    warn!(assignee, error = %err, "assignee lookup failed");
                    None
                }
            };
        }

        let group = ticket.group_id?;
        match self.directory.get_group(group).await {
            Ok(group) => Some(group.name),
            Err(err) => {
                warn!(group, error = %err, "group lookup failed");
                None
            }
        }
    }
}
