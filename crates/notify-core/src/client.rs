//! Notification client event loop
//!
//! [`NotifyClient::run`] is the only place that mutates the open call and
//! the panel. It processes, one at a time and in arrival order:
//!
//! - link events (connection status and decoded stream messages)
//! - host events (dial-out, pane activation, error dismissal, navigation)
//! - completions of background work: enrichment results and timers
//!
//! Enrichment and timers run in spawned tasks and report back over an
//! internal channel. Nothing in flight is ever cancelled; instead every
//! completion is checked against the latest display of the open call before
//! it may touch the panel, so superseded results are simply dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use callnotify_core::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # struct NullShell;
//! # impl Shell for NullShell {
//! #     fn render(&self, _: &Presentation) {}
//! #     fn resize(&self, _: u32, _: u32) {}
//! #     fn set_visible(&self, _: bool) {}
//! #     fn navigate_to(&self, _: RecordKind, _: u64) {}
//! # }
//! # async fn example() -> callnotify_core::Result<()> {
//! let config = NotifyConfig::new();
//! let context = HostContext {
//!     current_user_id: "42".to_string(),
//!     account_subdomain: "acme".to_string(),
//! };
//! let directory = Arc::new(HttpDirectory::from_config(&config.directory, &context)?);
//!
//! let (client, link_events) = NotifyClient::connect(&config, &context, directory, Arc::new(NullShell))?;
//! let (host_tx, host_rx) = mpsc::channel(16);
//! let task = tokio::spawn(client.run(link_events, host_rx));
//!
//! host_tx.send(HostEvent::DialOut("0501234567".to_string())).await.ok();
//! drop(host_tx); // closing the host channel shuts the client down
//! task.await.ok();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::alerts::Alert;
use crate::config::{NotifyConfig, TimingConfig};
use crate::dialer::OutboundDialer;
use crate::directory::Directory;
use crate::enrichment::EnrichmentPipeline;
use crate::error::Result;
use crate::lifecycle::{CallDecision, CallLifecycle, DisplayToken, HideTimer};
use crate::presenter::{NotificationPresenter, PresentationDescriptor, View};
use crate::shell::{HostContext, HostEvent, Shell};
use crate::stream::{CallNotice, InboundEvent, LinkEvent, ReconnectPolicy, StreamLink, StreamWriter};

/// Completions of work running outside the loop
#[derive(Debug)]
enum Completion {
    Enriched(DisplayToken, PresentationDescriptor),
    HideTimerFired(HideTimer),
    RestoreDialer,
}

pub struct NotifyClient<W: StreamWriter> {
    writer: W,
    dialer: OutboundDialer<W>,
    lifecycle: CallLifecycle,
    presenter: NotificationPresenter,
    pipeline: EnrichmentPipeline,
    timing: TimingConfig,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
}

impl NotifyClient<StreamLink> {
    /// Open the event stream for `context` and build a client around it
    pub fn connect(
        config: &NotifyConfig,
        context: &HostContext,
        directory: Arc<dyn Directory>,
        shell: Arc<dyn Shell>,
    ) -> Result<(Self, mpsc::Receiver<LinkEvent>)> {
        let endpoint = config.stream.endpoint_url(context)?;
        info!(%endpoint, user = %context.current_user_id, "starting notification client");

        let (link, events) = StreamLink::connect(endpoint, ReconnectPolicy::from(&config.stream));
        let client = Self::new(link, directory, shell, config.timing.clone());
        Ok((client, events))
    }
}

impl<W: StreamWriter + Clone> NotifyClient<W> {
    pub fn new(
        writer: W,
        directory: Arc<dyn Directory>,
        shell: Arc<dyn Shell>,
        timing: TimingConfig,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            dialer: OutboundDialer::new(writer.clone()),
            writer,
            lifecycle: CallLifecycle::new(),
            presenter: NotificationPresenter::new(shell),
            pipeline: EnrichmentPipeline::new(directory),
            timing,
            completion_tx,
            completion_rx: Some(completion_rx),
        }
    }

    /// Process events until the host channel closes, then close the stream
    pub async fn run(
        mut self,
        mut link_events: mpsc::Receiver<LinkEvent>,
        mut host_events: mpsc::Receiver<HostEvent>,
    ) {
        let Some(mut completions) = self.completion_rx.take() else {
            warn!("notification client already ran");
            return;
        };

        self.presenter.show_dialer();
        let mut link_alive = true;

        loop {
            tokio::select! {
                Some(completion) = completions.recv() => self.handle_completion(completion),
                event = link_events.recv(), if link_alive => match event {
                    Some(event) => self.handle_link_event(event),
                    None => {
                        debug!("link event channel closed");
                        link_alive = false;
                    }
                },
                event = host_events.recv() => match event {
                    Some(event) => self.handle_host_event(event),
                    None => break,
                },
            }
        }

        info!("host detached; stopping notification client");
        self.writer.shutdown();
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Opened => info!("event stream open"),
            LinkEvent::Message(message) => self.handle_inbound(message),
            LinkEvent::Closed { intentional } => debug!(intentional, "event stream closed"),
            LinkEvent::Reconnecting { attempt, delay } => {
                debug!(attempt, delay_secs = delay.as_secs_f64(), "event stream reconnect pending")
            }
            LinkEvent::Failed => self.raise(Alert::ConnectionLost),
        }
    }

    fn handle_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::DialStart(notice) | InboundEvent::AnsweredCall(notice) => {
                self.on_call(notice)
            }
            InboundEvent::DialEnd { call_id } => {
                let decision = self.lifecycle.on_dial_end(&call_id);
                self.apply(decision, None);
            }
            // Unknown kinds are a deliberate no-op.
            InboundEvent::Unknown(kind) => debug!(%kind, "ignoring unknown stream event"),
            status => match Alert::from_event(&status) {
                Some(alert) => self.raise(alert),
                None => debug!(kind = status.kind(), "stream event without effect"),
            },
        }
    }

    fn on_call(&mut self, notice: CallNotice) {
        debug!(
            call_id = %notice.call.call_id,
            direction = ?notice.call.direction,
            phase = ?notice.call.call_phase,
            "call event"
        );
        let decision = self.lifecycle.on_call(&notice.call);
        self.apply(decision, Some(notice));
    }

    fn apply(&mut self, decision: CallDecision, notice: Option<CallNotice>) {
        match decision {
            CallDecision::Display { token, auto_hide } => {
                if let Some(timer) = auto_hide {
                    self.schedule(self.timing.auto_hide(), Completion::HideTimerFired(timer));
                }
                if let Some(notice) = notice {
                    debug!(call_id = %token.call_id(), "enriching call");
                    self.spawn_enrichment(token, notice);
                }
            }
            CallDecision::Hide { call_id } => {
                debug!(%call_id, "call ended; hiding panel");
                self.hide_panel();
            }
            CallDecision::Ignore(reason) => debug!(?reason, "call event ignored"),
        }
    }

    fn spawn_enrichment(&self, token: DisplayToken, notice: CallNotice) {
        let pipeline = self.pipeline.clone();
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let descriptor = pipeline
                .enrich(&notice.call, notice.contact_id, notice.ticket_id)
                .await;
            let _ = completions.send(Completion::Enriched(token, descriptor));
        });
    }

    fn schedule(&self, delay: std::time::Duration, completion: Completion) {
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = completions.send(completion);
        });
    }

    fn hide_panel(&mut self) {
        self.presenter.hide();
        self.schedule(self.timing.restore_dialer(), Completion::RestoreDialer);
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Enriched(token, descriptor) => {
                if self.lifecycle.is_current(&token) {
                    self.presenter.show_call_info(descriptor);
                } else {
                    debug!(call_id = %descriptor.call_id, "discarding superseded enrichment");
                }
            }
            Completion::HideTimerFired(timer) => {
                if self.lifecycle.on_hide_timer(&timer) {
                    debug!(call_id = %timer.call_id(), "auto-hiding answered call");
                    self.hide_panel();
                }
            }
            Completion::RestoreDialer => {
                if self.lifecycle.is_idle() && self.presenter.view() == View::CallInfo {
                    self.presenter.show_dialer();
                }
            }
        }
    }

    fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::DialOut(number) => {
                self.dialer.dial(&number);
            }
            HostEvent::PaneActivated => self.presenter.on_pane_activated(),
            HostEvent::ErrorDismissed => self.presenter.dismiss_error(),
            HostEvent::Navigate(kind) => self.presenter.navigate(kind),
        }
    }

    fn raise(&mut self, alert: Alert) {
        warn!(?alert, class = ?alert.class(), "alerting operator");
        let descriptor = alert.descriptor();
        if alert.is_latched() {
            self.presenter.latch_error(descriptor);
        } else {
            self.presenter.show_error(descriptor);
        }
        if alert.closes_stream() {
            self.writer.shutdown();
        }
    }
}
