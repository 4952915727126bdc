//! Outbound dialing
//!
//! Dial requests from the host and from the dialer view both end up as a
//! single `callTo` stream message. The backend answers problems with
//! `operatorOnGsmWarn` or `wrongToNumber`, which arrive through the normal
//! inbound flow.

use tracing::{info, warn};

use crate::stream::{OutboundEvent, StreamWriter};

#[derive(Debug, Clone)]
pub struct OutboundDialer<W> {
    writer: W,
}

impl<W: StreamWriter> OutboundDialer<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Ask the backend to call `number`. Returns false for a blank number,
    /// which is dropped.
    pub fn dial(&self, number: &str) -> bool {
        let number = number.trim();
        if number.is_empty() {
            warn!("ignoring dial request without a number");
            return false;
        }

        info!(to = number, "placing outbound call");
        self.writer.send_event(OutboundEvent::CallTo {
            to: number.to_string(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturingWriter {
        sent: Arc<Mutex<Vec<OutboundEvent>>>,
    }

    impl StreamWriter for CapturingWriter {
        fn send_event(&self, event: OutboundEvent) {
            self.sent.lock().unwrap().push(event);
        }

        fn shutdown(&self) {}
    }

    #[test]
    fn test_dial_emits_call_to() {
        let writer = CapturingWriter::default();
        let dialer = OutboundDialer::new(writer.clone());

        assert!(dialer.dial(" 0501234567\n"));
        assert_eq!(
            writer.sent.lock().unwrap().as_slice(),
            [OutboundEvent::CallTo {
                to: "0501234567".to_string()
            }]
        );
    }

    #[test]
    fn test_blank_number_is_dropped() {
        let writer = CapturingWriter::default();
        let dialer = OutboundDialer::new(writer.clone());

        assert!(!dialer.dial("   "));
        assert!(writer.sent.lock().unwrap().is_empty());
    }
}
