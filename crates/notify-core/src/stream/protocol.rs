//! Stream wire protocol
//!
//! Every inbound message is a JSON object carrying an `eventType`
//! discriminant. [`decode`] turns one raw message into an [`InboundEvent`];
//! kinds this client does not know decode to [`InboundEvent::Unknown`] and
//! are ignored downstream.
//!
//! ```rust
//! use callnotify_core::stream::protocol::{decode, InboundEvent};
//!
//! let event = decode(r#"{"eventType":"dialEnd","callId":"c1"}"#).unwrap();
//! match event {
//!     InboundEvent::DialEnd { call_id } => assert_eq!(call_id.as_str(), "c1"),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Opaque identity of one phone call, stable for the call's lifetime.
///
/// The backend sends it either as a number or as a string; both compare
/// equal once decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        CallId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CallId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Scalar::deserialize(deserializer)? {
            Scalar::Text(text) => Ok(CallId(text)),
            Scalar::Number(number) => Ok(CallId(number.to_string())),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

/// Directory record id hint (`contactId` / `ticketId`); accepts numbers,
/// numeric strings and null.
fn record_hint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match value {
        Some(Scalar::Number(number)) => number.as_u64(),
        Some(Scalar::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Strings the backend may send as `null`
fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_called_to<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Direction of a call as seen from the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CallDirection {
    /// `IN`, and any value the backend adds later
    Inbound,
    /// `OUT`
    Outbound,
    /// `INNER`, operator to operator; never surfaced
    Internal,
}

impl From<String> for CallDirection {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "OUT" => CallDirection::Outbound,
            "INNER" => CallDirection::Internal,
            _ => CallDirection::Inbound,
        }
    }
}

/// Progress of a call when the event was emitted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CallPhase {
    Ringing,
    Answered,
    Other(String),
}

impl Default for CallPhase {
    fn default() -> Self {
        CallPhase::Ringing
    }
}

impl From<String> for CallPhase {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "RINGING" => CallPhase::Ringing,
            "ANSWERED" => CallPhase::Answered,
            _ => CallPhase::Other(raw),
        }
    }
}

/// Call description attached to `dialStart` / `answeredCall`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    #[serde(rename = "rid", alias = "callId")]
    pub call_id: CallId,
    pub direction: CallDirection,
    /// Free-form classification (`REGULAR`, `TRACKING`, `C2C_*`, ...)
    #[serde(rename = "type", default, deserialize_with = "nullable_string")]
    pub call_type: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub called_from: String,
    #[serde(default, deserialize_with = "nullable_called_to")]
    pub called_to: Vec<String>,
    #[serde(default)]
    pub call_phase: CallPhase,
    #[serde(default)]
    pub outer_number: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub utm_term: Option<String>,
    #[serde(default)]
    pub utm_content: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

impl CallPayload {
    /// A bare call with no numbers or analytics attached
    pub fn new(call_id: CallId, direction: CallDirection, call_type: impl Into<String>) -> Self {
        Self {
            call_id,
            direction,
            call_type: call_type.into(),
            called_from: String::new(),
            called_to: Vec::new(),
            call_phase: CallPhase::Ringing,
            outer_number: None,
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_term: None,
            utm_content: None,
            google_id: None,
            referer: None,
            ip: None,
        }
    }

    /// The remote party's number: caller for inbound, first callee otherwise
    pub fn client_number(&self) -> &str {
        match self.direction {
            CallDirection::Inbound => &self.called_from,
            _ => self.called_to.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn is_answered(&self) -> bool {
        self.call_phase == CallPhase::Answered
    }
}

/// Call start (or answer) with optional directory hints from the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNotice {
    pub call: CallPayload,
    #[serde(default, deserialize_with = "record_hint")]
    pub contact_id: Option<u64>,
    #[serde(default, deserialize_with = "record_hint")]
    pub ticket_id: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DialEndBody {
    #[serde(alias = "rid")]
    call_id: CallId,
}

#[derive(Deserialize)]
struct WrongToNumberBody {
    #[serde(default)]
    to: Option<Scalar>,
}

/// One decoded stream message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Backend refuses to serve this widget instance
    Blocked,
    /// Account is not connected to the telephony backend
    AccountNotFound,
    /// Operator has no internal line configured
    NoOperatorNumber,
    /// Outbound dial needs an internal line, operator is on GSM
    OperatorOnGsmWarning,
    /// Outbound dial to an invalid destination
    WrongToNumber { to: String },
    DialStart(CallNotice),
    DialEnd { call_id: CallId },
    AnsweredCall(CallNotice),
    /// Discriminant this client does not handle
    Unknown(String),
}

impl InboundEvent {
    /// Wire discriminant of this event
    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::Blocked => "blocked",
            InboundEvent::AccountNotFound => "notFoundAcc",
            InboundEvent::NoOperatorNumber => "noOperatorNumber",
            InboundEvent::OperatorOnGsmWarning => "operatorOnGsmWarn",
            InboundEvent::WrongToNumber { .. } => "wrongToNumber",
            InboundEvent::DialStart(_) => "dialStart",
            InboundEvent::DialEnd { .. } => "dialEnd",
            InboundEvent::AnsweredCall(_) => "answeredCall",
            InboundEvent::Unknown(kind) => kind,
        }
    }
}

/// Messages this client writes to the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "eventType")]
pub enum OutboundEvent {
    /// Ask the backend to place an outbound call
    #[serde(rename = "callTo")]
    CallTo { to: String },
}

/// Decode one raw stream message
pub fn decode(raw: &str) -> Result<InboundEvent, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

    // Legacy flag: refused instances are marked with `blocked: true`
    // instead of (or in addition to) a discriminant.
    if object.get("blocked").and_then(Value::as_bool) == Some(true) {
        return Ok(InboundEvent::Blocked);
    }

    let kind = object
        .get("eventType")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingEventType)?
        .to_string();

    let event = match kind.as_str() {
        "blocked" => InboundEvent::Blocked,
        "notFoundAcc" => InboundEvent::AccountNotFound,
        "noOperatorNumber" => InboundEvent::NoOperatorNumber,
        "operatorOnGsmWarn" => InboundEvent::OperatorOnGsmWarning,
        "wrongToNumber" => {
            let body: WrongToNumberBody = body_of(&kind, value)?;
            let to = match body.to {
                Some(Scalar::Text(text)) => text,
                Some(Scalar::Number(number)) => number.to_string(),
                None => String::new(),
            };
            InboundEvent::WrongToNumber { to }
        }
        "dialStart" => InboundEvent::DialStart(body_of(&kind, value)?),
        "dialEnd" => {
            let body: DialEndBody = body_of(&kind, value)?;
            InboundEvent::DialEnd {
                call_id: body.call_id,
            }
        }
        "answeredCall" => InboundEvent::AnsweredCall(body_of(&kind, value)?),
        _ => InboundEvent::Unknown(kind),
    };

    Ok(event)
}

fn body_of<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload {
        kind: kind.to_string(),
        source,
    })
}

/// Encode an outbound message for the wire
pub fn encode(event: &OutboundEvent) -> String {
    // Serializing a tagged enum of plain strings cannot fail.
    serde_json::to_string(event).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_dial_start_with_hints() {
        let raw = r#"{
            "eventType": "dialStart",
            "contactId": 381,
            "ticketId": "77",
            "call": {
                "rid": 1001,
                "direction": "IN",
                "type": "TRACKING",
                "calledFrom": "380501234567",
                "calledTo": ["0442223344"],
                "callPhase": "RINGING",
                "utmSource": "google",
                "ip": "10.0.0.1"
            }
        }"#;

        let InboundEvent::DialStart(notice) = decode(raw).unwrap() else {
            panic!("expected dialStart");
        };
        assert_eq!(notice.call.call_id, CallId::new("1001"));
        assert_eq!(notice.call.direction, CallDirection::Inbound);
        assert_eq!(notice.call.call_type, "TRACKING");
        assert_eq!(notice.call.client_number(), "380501234567");
        assert_eq!(notice.call.utm_source.as_deref(), Some("google"));
        assert_eq!(notice.call.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(notice.contact_id, Some(381));
        assert_eq!(notice.ticket_id, Some(77));
    }

    #[test]
    fn test_decode_call_id_alias_and_outbound_number() {
        let raw = r#"{"eventType":"answeredCall","contactId":null,
            "call":{"callId":"c9","direction":"OUT","type":"REGULAR",
                    "calledTo":["0501112233","0509998877"],"callPhase":"ANSWERED"}}"#;

        let InboundEvent::AnsweredCall(notice) = decode(raw).unwrap() else {
            panic!("expected answeredCall");
        };
        assert_eq!(notice.call.call_id.as_str(), "c9");
        assert_eq!(notice.call.client_number(), "0501112233");
        assert!(notice.call.is_answered());
        assert_eq!(notice.contact_id, None);
    }

    #[test]
    fn test_numeric_and_string_call_ids_compare_equal() {
        let a = decode(r#"{"eventType":"dialEnd","callId":55}"#).unwrap();
        let b = decode(r#"{"eventType":"dialEnd","callId":"55"}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_direction_is_inbound() {
        assert_eq!(CallDirection::from("SIDEWAYS".to_string()), CallDirection::Inbound);
        assert_eq!(CallDirection::from("INNER".to_string()), CallDirection::Internal);
    }

    #[test]
    fn test_status_events() {
        assert_eq!(decode(r#"{"eventType":"notFoundAcc"}"#).unwrap(), InboundEvent::AccountNotFound);
        assert_eq!(
            decode(r#"{"eventType":"noOperatorNumber"}"#).unwrap(),
            InboundEvent::NoOperatorNumber
        );
        assert_eq!(
            decode(r#"{"eventType":"operatorOnGsmWarn"}"#).unwrap(),
            InboundEvent::OperatorOnGsmWarning
        );
        assert_eq!(
            decode(r#"{"eventType":"wrongToNumber","to":"123"}"#).unwrap(),
            InboundEvent::WrongToNumber { to: "123".to_string() }
        );
    }

    #[test]
    fn test_blocked_flag_wins_over_discriminant() {
        assert_eq!(
            decode(r#"{"eventType":"dialEnd","blocked":true}"#).unwrap(),
            InboundEvent::Blocked
        );
        assert_eq!(decode(r#"{"eventType":"blocked"}"#).unwrap(), InboundEvent::Blocked);
    }

    #[test]
    fn test_unknown_kind_is_not_an_error() {
        assert_eq!(
            decode(r#"{"eventType":"queueStats","waiting":3}"#).unwrap(),
            InboundEvent::Unknown("queueStats".to_string())
        );
    }

    #[test]
    fn test_malformed_messages() {
        assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode(r#"{"call":{}}"#), Err(DecodeError::MissingEventType)));
        assert!(matches!(
            decode(r#"{"eventType":"dialStart","call":{"direction":"IN"}}"#),
            Err(DecodeError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_encode_call_to() {
        let raw = encode(&OutboundEvent::CallTo { to: "0501234567".to_string() });
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["eventType"], "callTo");
        assert_eq!(value["to"], "0501234567");
    }
}
