//! Directory collaborator: contacts, tickets and groups
//!
//! The enrichment pipeline only talks to the [`Directory`] trait. Records are
//! read-only snapshots fetched per call event and never cached, since the
//! directory may change between calls. [`HttpDirectory`] implements the trait
//! against the helpdesk REST API (`/api/v2/...`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, NotifyError};
use crate::shell::HostContext;

pub type UserId = u64;
pub type TicketId = u64;
pub type GroupId = u64;

/// A directory user (the caller or callee, or a ticket assignee)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectoryContact {
    pub id: UserId,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "photo", default, deserialize_with = "photo_url")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ticket workflow status
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TicketStatus {
    New,
    Open,
    Pending,
    Hold,
    Solved,
    Closed,
    Other(String),
}

impl TicketStatus {
    /// Solved and closed tickets are finished work
    pub fn is_finished(&self) -> bool {
        matches!(self, TicketStatus::Solved | TicketStatus::Closed)
    }
}

impl From<String> for TicketStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "new" => TicketStatus::New,
            "open" => TicketStatus::Open,
            "pending" => TicketStatus::Pending,
            "hold" => TicketStatus::Hold,
            "solved" => TicketStatus::Solved,
            "closed" => TicketStatus::Closed,
            _ => TicketStatus::Other(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectoryTicket {
    pub id: TicketId,
    #[serde(default, deserialize_with = "nullable")]
    pub subject: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectoryGroup {
    pub id: GroupId,
    pub name: String,
}

fn nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn photo_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Photo {
        content_url: Option<String>,
    }
    Ok(Option::<Photo>::deserialize(deserializer)?.and_then(|photo| photo.content_url))
}

/// Lookups the enrichment pipeline needs. Any error means "not found".
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<DirectoryContact, DirectoryError>;

    /// Users whose phone number ends with `phone`
    async fn search_users_by_phone(&self, phone: &str) -> Result<Vec<DirectoryContact>, DirectoryError>;

    async fn get_ticket(&self, id: TicketId) -> Result<DirectoryTicket, DirectoryError>;

    async fn search_tickets_by_requester(
        &self,
        requester: UserId,
    ) -> Result<Vec<DirectoryTicket>, DirectoryError>;

    async fn get_group(&self, id: GroupId) -> Result<DirectoryGroup, DirectoryError>;
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: DirectoryContact,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<DirectoryContact>,
}

#[derive(Deserialize)]
struct TicketEnvelope {
    ticket: DirectoryTicket,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Deserialize)]
struct GroupEnvelope {
    group: DirectoryGroup,
}

/// [`Directory`] over the helpdesk REST API
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpDirectory {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &DirectoryConfig, context: &HostContext) -> Result<Self, NotifyError> {
        Self::new(config.base_url_for(context)?, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<String>,
    ) -> Result<T, DirectoryError> {
        let url = self.base_url.join(path)?;
        let mut request = self.client.get(url);
        if let Some(query) = &query {
            request = request.query(&[("query", query.as_str())]);
        }

        debug!(path, query = ?query, "directory request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(path, status = status.as_u16(), "directory request failed");
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| DirectoryError::Shape(format!("{}: {}", path, err)))
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn get_user(&self, id: UserId) -> Result<DirectoryContact, DirectoryError> {
        let envelope: UserEnvelope = self.get_json(&format!("/api/v2/users/{}.json", id), None).await?;
        Ok(envelope.user)
    }

    async fn search_users_by_phone(&self, phone: &str) -> Result<Vec<DirectoryContact>, DirectoryError> {
        let envelope: UsersEnvelope = self
            .get_json("/api/v2/users.json", Some(format!("phone:*{}", phone)))
            .await?;
        Ok(envelope.users)
    }

    async fn get_ticket(&self, id: TicketId) -> Result<DirectoryTicket, DirectoryError> {
        let envelope: TicketEnvelope = self
            .get_json(&format!("/api/v2/tickets/{}.json", id), None)
            .await?;
        Ok(envelope.ticket)
    }

    async fn search_tickets_by_requester(
        &self,
        requester: UserId,
    ) -> Result<Vec<DirectoryTicket>, DirectoryError> {
        let envelope: SearchEnvelope = self
            .get_json("/api/v2/search.json", Some(format!("requester:{}", requester)))
            .await?;

        // Search may mix record types; keep tickets only. A ticket that does
        // not parse fails the whole lookup so the candidate count stays exact.
        envelope
            .results
            .into_iter()
            .filter(|result| {
                result
                    .get("result_type")
                    .and_then(Value::as_str)
                    .map_or(true, |kind| kind == "ticket")
            })
            .map(|result| {
                serde_json::from_value::<DirectoryTicket>(result).map_err(|err| {
                    DirectoryError::Shape(format!("/api/v2/search.json: {}", err))
                })
            })
            .collect()
    }

    async fn get_group(&self, id: GroupId) -> Result<DirectoryGroup, DirectoryError> {
        let envelope: GroupEnvelope = self
            .get_json(&format!("/api/v2/groups/{}.json", id), None)
            .await?;
        Ok(envelope.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_photo_flattened() {
        let contact: DirectoryContact = serde_json::from_str(
            r#"{"id":7,"name":"Olena","photo":{"content_url":"https://cdn/x.png"},
                "notes":null,"created_at":"2019-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(contact.photo_url.as_deref(), Some("https://cdn/x.png"));
        assert_eq!(contact.notes, None);

        let contact: DirectoryContact =
            serde_json::from_str(r#"{"id":8,"name":"Petro","photo":null,"created_at":"2020-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(contact.photo_url, None);
    }

    #[test]
    fn test_ticket_status_classification() {
        assert!(TicketStatus::from("solved".to_string()).is_finished());
        assert!(TicketStatus::from("closed".to_string()).is_finished());
        assert!(!TicketStatus::from("pending".to_string()).is_finished());
        assert_eq!(
            TicketStatus::from("archived".to_string()),
            TicketStatus::Other("archived".to_string())
        );
    }
}
