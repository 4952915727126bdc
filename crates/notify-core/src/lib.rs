//! # Callnotify-Core - Real-time call notifications for helpdesk operators
//!
//! This crate keeps a resilient event stream open to the telephony backend,
//! tracks which call is on screen, enriches it with directory data (contact,
//! latest open ticket, assignee) and drives a host-embedded panel through
//! three views: dialer, call info and error.
//!
//! The pieces, bottom-up:
//!
//! - [`stream`]: wire protocol and the reconnecting stream link
//! - [`lifecycle`]: the open call, auto-hide timers and stale event guards
//! - [`directory`] and [`enrichment`]: lookups and the presentation descriptor
//! - [`presenter`] and [`alerts`]: views and operator-visible failures
//! - [`client`]: the event loop tying it all together

pub mod alerts;
pub mod client;
pub mod config;
pub mod dialer;
pub mod directory;
pub mod enrichment;
pub mod error;
pub mod lifecycle;
pub mod presenter;
pub mod shell;
pub mod stream;

pub use alerts::{Alert, AlertClass};
pub use client::NotifyClient;
pub use config::{DirectoryConfig, NotifyConfig, StreamConfig, TimingConfig};
pub use dialer::OutboundDialer;
pub use directory::{Directory, DirectoryContact, DirectoryGroup, DirectoryTicket, HttpDirectory, TicketStatus};
pub use enrichment::EnrichmentPipeline;
pub use error::{DecodeError, DirectoryError, NotifyError, Result};
pub use lifecycle::{CallDecision, CallLifecycle, DisplayToken, LifecycleState};
pub use presenter::{NotificationPresenter, Presentation, PresentationDescriptor, View};
pub use shell::{HostContext, HostEvent, RecordKind, Shell};
pub use stream::{CallId, CallPayload, InboundEvent, LinkEvent, OutboundEvent, StreamLink, StreamWriter};

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        Alert, CallId, CallPayload, Directory, HostContext, HostEvent, HttpDirectory,
        InboundEvent, LinkEvent, NotifyClient, NotifyConfig, NotifyError, OutboundEvent,
        Presentation, PresentationDescriptor, RecordKind, Result, Shell, StreamLink,
        StreamWriter, View,
    };
}
