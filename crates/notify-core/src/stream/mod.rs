//! Event stream: wire protocol and the resilient connection carrying it

pub mod link;
pub mod protocol;

pub use link::{CloseOutcome, ConnectionSession, LinkEvent, ReconnectPolicy, StreamLink, StreamWriter};
pub use protocol::{
    decode, CallDirection, CallId, CallNotice, CallPayload, CallPhase, InboundEvent,
    OutboundEvent,
};
