//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use callnotify_core::directory::{GroupId, TicketId, UserId};
use callnotify_core::error::DirectoryError;
use callnotify_core::presenter::View;
use callnotify_core::{
    Directory, DirectoryContact, DirectoryGroup, DirectoryTicket, OutboundEvent, Presentation,
    RecordKind, Shell, StreamWriter, TicketStatus,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCall {
    Render(Presentation),
    Resize(u32, u32),
    Visible(bool),
    Navigate(RecordKind, u64),
}

/// Shell that records every invocation in order
#[derive(Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<ShellCall>>,
}

impl RecordingShell {
    pub fn take(&self) -> Vec<ShellCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    /// Presentations rendered since the last `take`, without draining
    pub fn rendered(&self) -> Vec<Presentation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                ShellCall::Render(presentation) => Some(presentation.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_view(&self) -> Option<View> {
        self.rendered().last().map(Presentation::view)
    }
}

impl Shell for RecordingShell {
    fn render(&self, presentation: &Presentation) {
        self.calls.lock().unwrap().push(ShellCall::Render(presentation.clone()));
    }

    fn resize(&self, height: u32, width: u32) {
        self.calls.lock().unwrap().push(ShellCall::Resize(height, width));
    }

    fn set_visible(&self, visible: bool) {
        self.calls.lock().unwrap().push(ShellCall::Visible(visible));
    }

    fn navigate_to(&self, kind: RecordKind, id: u64) {
        self.calls.lock().unwrap().push(ShellCall::Navigate(kind, id));
    }
}

/// Writer that keeps everything sent through it
#[derive(Clone, Default)]
pub struct CapturingWriter {
    sent: Arc<Mutex<Vec<OutboundEvent>>>,
    shutdowns: Arc<Mutex<u32>>,
}

impl CapturingWriter {
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> u32 {
        *self.shutdowns.lock().unwrap()
    }
}

impl StreamWriter for CapturingWriter {
    fn send_event(&self, event: OutboundEvent) {
        self.sent.lock().unwrap().push(event);
    }

    fn shutdown(&self) {
        *self.shutdowns.lock().unwrap() += 1;
    }
}

/// In-memory directory; phone searches can be slowed down per number
#[derive(Default)]
pub struct FakeDirectory {
    pub users: Vec<DirectoryContact>,
    pub tickets: Vec<(UserId, DirectoryTicket)>,
    pub groups: Vec<DirectoryGroup>,
    pub phone_index: HashMap<String, Vec<UserId>>,
    pub search_delays: HashMap<String, Duration>,
}

impl FakeDirectory {
    pub fn with_user(mut self, user: DirectoryContact, phone: &str) -> Self {
        self.phone_index.entry(phone.to_string()).or_default().push(user.id);
        self.users.push(user);
        self
    }

    pub fn with_ticket(mut self, requester: UserId, ticket: DirectoryTicket) -> Self {
        self.tickets.push((requester, ticket));
        self
    }

    pub fn with_group(mut self, group: DirectoryGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_search_delay(mut self, phone: &str, delay: Duration) -> Self {
        self.search_delays.insert(phone.to_string(), delay);
        self
    }

    fn missing(path: &str) -> DirectoryError {
        DirectoryError::Status {
            status: 404,
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn get_user(&self, id: UserId) -> Result<DirectoryContact, DirectoryError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| Self::missing("users"))
    }

    async fn search_users_by_phone(&self, phone: &str) -> Result<Vec<DirectoryContact>, DirectoryError> {
        if let Some(delay) = self.search_delays.get(phone) {
            tokio::time::sleep(*delay).await;
        }
        let ids = self.phone_index.get(phone).cloned().unwrap_or_default();
        Ok(self
            .users
            .iter()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<DirectoryTicket, DirectoryError> {
        self.tickets
            .iter()
            .map(|(_, ticket)| ticket)
            .find(|ticket| ticket.id == id)
            .cloned()
            .ok_or_else(|| Self::missing("tickets"))
    }

    async fn search_tickets_by_requester(
        &self,
        requester: UserId,
    ) -> Result<Vec<DirectoryTicket>, DirectoryError> {
        Ok(self
            .tickets
            .iter()
            .filter(|(owner, _)| *owner == requester)
            .map(|(_, ticket)| ticket.clone())
            .collect())
    }

    async fn get_group(&self, id: GroupId) -> Result<DirectoryGroup, DirectoryError> {
        self.groups
            .iter()
            .find(|group| group.id == id)
            .cloned()
            .ok_or_else(|| Self::missing("groups"))
    }
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn contact(id: UserId, name: &str, created_at: DateTime<Utc>) -> DirectoryContact {
    DirectoryContact {
        id,
        name: name.to_string(),
        photo_url: None,
        notes: None,
        created_at,
    }
}

pub fn ticket(id: TicketId, status: TicketStatus, created_at: DateTime<Utc>) -> DirectoryTicket {
    DirectoryTicket {
        id,
        subject: format!("Ticket {}", id),
        description: "Customer cannot log in".to_string(),
        assignee_id: None,
        group_id: None,
        status,
        created_at,
    }
}

/// Let spawned tasks and the client loop drain their queues
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
