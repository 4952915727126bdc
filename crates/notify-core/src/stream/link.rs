//! Resilient event stream connection
//!
//! [`StreamLink`] owns one WebSocket connection to the backend and keeps it
//! alive with a fixed-delay, bounded retry policy. The connection runs in its
//! own task and reports a closed set of [`LinkEvent`]s over a channel; the
//! handle only forwards commands (outbound messages and shutdown).
//!
//! # Reconnect policy
//!
//! ```text
//!   open ──close──▶ retry_count += 1 ──≤ max──▶ wait delay ──▶ open
//!                                      └─> max──▶ Failed (once), task ends
//!   close() ──▶ intentional, no reconnect
//! ```
//!
//! Failed connection attempts count as unintended closes. The retry budget
//! spans the whole session unless `reset_on_open` is set.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::StreamConfig;
use crate::stream::protocol::{decode, encode, InboundEvent, OutboundEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events reported by the link task
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A connection (first or reconnected) is open
    Opened,
    /// A decoded inbound message
    Message(InboundEvent),
    /// The connection closed
    Closed { intentional: bool },
    /// A new connection attempt is scheduled after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// Retry budget exhausted; reported once, the link is gone for good
    Failed,
}

/// Reconnect parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_reconnects: u32,
    pub reset_on_open: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for ReconnectPolicy {
    fn from(config: &StreamConfig) -> Self {
        Self {
            delay: config.reconnect_delay(),
            max_reconnects: config.max_reconnects,
            reset_on_open: config.reset_retries_on_open,
        }
    }
}

/// What to do after a connection closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Shutdown was requested; stay closed
    Intentional,
    /// Try again after `delay`
    Reconnect { attempt: u32, delay: Duration },
    /// Budget exhausted just now; report the failure
    Latched,
    /// Budget was exhausted earlier; report nothing
    AlreadyLatched,
}

/// Bookkeeping for one logical stream session across reconnects
#[derive(Debug)]
pub struct ConnectionSession {
    endpoint: Url,
    policy: ReconnectPolicy,
    retry_count: u32,
    failure_latched: bool,
    closing_intentional: bool,
}

impl ConnectionSession {
    pub fn new(endpoint: Url, policy: ReconnectPolicy) -> Self {
        Self {
            endpoint,
            policy,
            retry_count: 0,
            failure_latched: false,
            closing_intentional: false,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_latched(&self) -> bool {
        self.failure_latched
    }

    pub fn mark_intentional(&mut self) {
        self.closing_intentional = true;
    }

    pub fn on_open(&mut self) {
        if self.policy.reset_on_open {
            self.retry_count = 0;
        }
    }

    pub fn on_close(&mut self) -> CloseOutcome {
        if self.closing_intentional {
            return CloseOutcome::Intentional;
        }
        if self.failure_latched {
            return CloseOutcome::AlreadyLatched;
        }

        self.retry_count += 1;
        if self.retry_count > self.policy.max_reconnects {
            self.failure_latched = true;
            CloseOutcome::Latched
        } else {
            CloseOutcome::Reconnect {
                attempt: self.retry_count,
                delay: self.policy.delay,
            }
        }
    }
}

#[derive(Debug)]
enum LinkCommand {
    Send(OutboundEvent),
    Close,
}

/// Handle to the stream connection task
///
/// Cloning the handle is cheap; the connection shuts down on [`close`](Self::close)
/// or once every handle is dropped.
#[derive(Debug, Clone)]
pub struct StreamLink {
    commands: mpsc::UnboundedSender<LinkCommand>,
}

impl StreamLink {
    /// Start the connection task for `endpoint`
    pub fn connect(endpoint: Url, policy: ReconnectPolicy) -> (Self, mpsc::Receiver<LinkEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(run_link(
            ConnectionSession::new(endpoint, policy),
            command_rx,
            event_tx,
        ));

        (
            Self {
                commands: command_tx,
            },
            event_rx,
        )
    }

    /// Queue an outbound message. Dropped with a warning if the socket is not
    /// open when the link task picks it up.
    pub fn send(&self, event: OutboundEvent) {
        if self.commands.send(LinkCommand::Send(event)).is_err() {
            warn!("event stream is gone; dropping outbound message");
        }
    }

    /// Close the connection without reconnecting
    pub fn close(&self) {
        let _ = self.commands.send(LinkCommand::Close);
    }

    /// Whether the link task is still running
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Write side of the event stream, as used by the dialer and the client
pub trait StreamWriter: Send + Sync + 'static {
    fn send_event(&self, event: OutboundEvent);

    /// Close the stream for good
    fn shutdown(&self);
}

impl StreamWriter for StreamLink {
    fn send_event(&self, event: OutboundEvent) {
        self.send(event);
    }

    fn shutdown(&self) {
        self.close();
    }
}

async fn emit(events: &mpsc::Sender<LinkEvent>, event: LinkEvent) {
    if events.send(event).await.is_err() {
        debug!("link event receiver dropped");
    }
}

async fn run_link(
    mut session: ConnectionSession,
    mut commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::Sender<LinkEvent>,
) {
    loop {
        if let Some(socket) = open(&mut session, &mut commands).await {
            info!(endpoint = %session.endpoint(), "event stream connected");
            session.on_open();
            emit(&events, LinkEvent::Opened).await;
            pump(socket, &mut session, &mut commands, &events).await;
        }

        match session.on_close() {
            CloseOutcome::Intentional => {
                info!("event stream closed on request");
                emit(&events, LinkEvent::Closed { intentional: true }).await;
                return;
            }
            CloseOutcome::Reconnect { attempt, delay } => {
                warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    "event stream lost; reconnecting"
                );
                emit(&events, LinkEvent::Closed { intentional: false }).await;
                emit(&events, LinkEvent::Reconnecting { attempt, delay }).await;
                if !wait_before_retry(delay, &mut session, &mut commands).await {
                    emit(&events, LinkEvent::Closed { intentional: true }).await;
                    return;
                }
            }
            CloseOutcome::Latched => {
                error!(
                    attempts = session.retry_count(),
                    "event stream lost; reconnect budget exhausted"
                );
                emit(&events, LinkEvent::Closed { intentional: false }).await;
                emit(&events, LinkEvent::Failed).await;
                return;
            }
            CloseOutcome::AlreadyLatched => return,
        }
    }
}

/// Connect, while honoring shutdown and dropping sends issued meanwhile
async fn open(
    session: &mut ConnectionSession,
    commands: &mut mpsc::UnboundedReceiver<LinkCommand>,
) -> Option<Socket> {
    let connecting = connect_async(session.endpoint().to_string());
    tokio::pin!(connecting);

    loop {
        tokio::select! {
            result = &mut connecting => {
                return match result {
                    Ok((socket, _response)) => Some(socket),
                    Err(err) => {
                        warn!(endpoint = %session.endpoint(), error = %err, "failed connecting to event stream");
                        None
                    }
                };
            }
            command = commands.recv() => match command {
                Some(LinkCommand::Send(event)) => drop_unsent(&event),
                Some(LinkCommand::Close) | None => {
                    session.mark_intentional();
                    return None;
                }
            }
        }
    }
}

/// Returns false if shutdown was requested during the wait
async fn wait_before_retry(
    delay: Duration,
    session: &mut ConnectionSession,
    commands: &mut mpsc::UnboundedReceiver<LinkCommand>,
) -> bool {
    let deadline = tokio::time::sleep(delay);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => return true,
            command = commands.recv() => match command {
                Some(LinkCommand::Send(event)) => drop_unsent(&event),
                Some(LinkCommand::Close) | None => {
                    session.mark_intentional();
                    return false;
                }
            }
        }
    }
}

fn drop_unsent(event: &OutboundEvent) {
    warn!(?event, "event stream is not open; dropping outbound message");
}

async fn pump(
    socket: Socket,
    session: &mut ConnectionSession,
    commands: &mut mpsc::UnboundedReceiver<LinkCommand>,
    events: &mpsc::Sender<LinkEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    debug!(message = %text.as_str(), "incoming stream message");
                    match decode(text.as_str()) {
                        Ok(event) => emit(events, LinkEvent::Message(event)).await,
                        Err(err) => warn!(error = %err, "dropping undecodable stream message"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed event stream");
                    return;
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    warn!(error = %err, "event stream read error");
                    return;
                }
                None => return,
            },
            command = commands.recv() => match command {
                Some(LinkCommand::Send(event)) => {
                    let payload = encode(&event);
                    debug!(message = %payload, "outgoing stream message");
                    if let Err(err) = sink.send(Message::Text(payload.into())).await {
                        warn!(error = %err, "failed writing to event stream");
                    }
                }
                Some(LinkCommand::Close) | None => {
                    session.mark_intentional();
                    if let Err(err) = sink.close().await {
                        debug!(error = %err, "error while closing event stream");
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(max_reconnects: u32, reset_on_open: bool) -> ConnectionSession {
        ConnectionSession::new(
            Url::parse("ws://127.0.0.1:1/tracking").unwrap(),
            ReconnectPolicy {
                delay: Duration::from_secs(10),
                max_reconnects,
                reset_on_open,
            },
        )
    }

    #[test]
    fn test_nine_reconnects_then_latch_once() {
        let mut session = session(9, false);

        for attempt in 1..=9 {
            assert_eq!(
                session.on_close(),
                CloseOutcome::Reconnect {
                    attempt,
                    delay: Duration::from_secs(10)
                }
            );
        }
        assert_eq!(session.on_close(), CloseOutcome::Latched);
        assert!(session.is_latched());

        for _ in 0..5 {
            assert_eq!(session.on_close(), CloseOutcome::AlreadyLatched);
        }
    }

    #[test]
    fn test_intentional_close_never_reconnects() {
        let mut session = session(9, false);
        session.on_close();
        session.mark_intentional();
        assert_eq!(session.on_close(), CloseOutcome::Intentional);
        assert_eq!(session.retry_count(), 1);
    }

    #[test]
    fn test_successful_open_keeps_budget_by_default() {
        let mut session = session(2, false);
        session.on_close();
        session.on_open();
        session.on_close();
        session.on_open();
        assert_eq!(session.on_close(), CloseOutcome::Latched);
    }

    #[test]
    fn test_reset_on_open_restores_budget() {
        let mut session = session(2, true);
        for _ in 0..10 {
            assert!(matches!(session.on_close(), CloseOutcome::Reconnect { attempt: 1, .. }));
            session.on_open();
        }
    }

    #[test]
    fn test_default_policy_matches_stream_defaults() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert_eq!(policy.max_reconnects, 9);
        assert!(!policy.reset_on_open);
    }
}
