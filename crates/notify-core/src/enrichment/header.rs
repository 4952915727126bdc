//! Call header: direction icon and call type label

use crate::presenter::{CallHeader, DirectionIcon};
use crate::stream::{CallDirection, CallPayload};

pub const LABEL_CLICK_TO_CALL: &str = "Входящий click to call звонок";
pub const LABEL_CALL_TRACKING: &str = "Входящий call tracking звонок";
pub const LABEL_OUTBOUND: &str = "Исходящий звонок";
pub const LABEL_DIRECT_INBOUND: &str = "Прямой входящий звонок";
pub const LABEL_AUTO_CALLBACK: &str = "Автоперезвон";
pub const LABEL_CALLBACK: &str = "Callback звонок";
pub const LABEL_AUTODIAL: &str = "Автообзвон";
pub const LABEL_API: &str = "API звонок";

/// Label for a call type; unknown types get an empty label
pub fn call_type_label(call_type: &str, direction: CallDirection) -> &'static str {
    if call_type.starts_with("C2C_") {
        return LABEL_CLICK_TO_CALL;
    }
    match call_type {
        "TRACKING" => LABEL_CALL_TRACKING,
        "REGULAR" if direction == CallDirection::Outbound => LABEL_OUTBOUND,
        "REGULAR" => LABEL_DIRECT_INBOUND,
        "AUTO_CB" => LABEL_AUTO_CALLBACK,
        "CALLBACK" => LABEL_CALLBACK,
        "AUTODIAL" => LABEL_AUTODIAL,
        "API" => LABEL_API,
        _ => "",
    }
}

pub fn call_header(call: &CallPayload) -> CallHeader {
    let icon = match call.direction {
        CallDirection::Outbound => DirectionIcon::Outbound,
        _ => DirectionIcon::Inbound,
    };
    CallHeader {
        icon,
        label: call_type_label(&call.call_type, call.direction).to_string(),
    }
}
