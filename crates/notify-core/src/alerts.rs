//! Operator-visible failures
//!
//! Lookup and decode failures never reach the operator. Everything in
//! [`Alert`] does, through the error view.

use crate::presenter::{ErrorDescriptor, ErrorLink};
use crate::stream::InboundEvent;

/// Telephony account settings page
pub const SETTINGS_URL: &str = "https://my.nextel.com.ua/index.html#zendesk";
pub const SETTINGS_LABEL: &str = "Настроить Nextel";

pub const MSG_CONNECTION_LOST: &str =
    "Виджет Nextel не работает! Вероятно у Вас нестабильное интернет подключение";
pub const MSG_ACCOUNT_NOT_CONNECTED: &str = "Виджет Nextel не работает! Этот аккаунт не подключен";
pub const MSG_NO_OPERATOR_NUMBER: &str =
    "Виджет Nextel не работает! Номер Вашей внутренней линии не указан";
pub const MSG_OPERATOR_ON_GSM: &str = "Для совершения звонка необходимо указать внутреннюю линию";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertClass {
    /// The stream is gone; latched, reported once
    Connectivity,
    /// The account cannot be served; latched, the stream is closed
    AccountConfiguration,
    /// The last action failed; dismissible, the stream stays open
    UsageWarning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// Reconnect budget exhausted
    ConnectionLost,
    /// Backend refused this instance
    Blocked,
    AccountNotConnected,
    NoOperatorNumber,
    OperatorOnGsm,
    WrongToNumber(String),
}

impl Alert {
    /// Alert carried by a stream event, if any
    pub fn from_event(event: &InboundEvent) -> Option<Alert> {
        match event {
            InboundEvent::Blocked => Some(Alert::Blocked),
            InboundEvent::AccountNotFound => Some(Alert::AccountNotConnected),
            InboundEvent::NoOperatorNumber => Some(Alert::NoOperatorNumber),
            InboundEvent::OperatorOnGsmWarning => Some(Alert::OperatorOnGsm),
            InboundEvent::WrongToNumber { to } => Some(Alert::WrongToNumber(to.clone())),
            _ => None,
        }
    }

    pub fn class(&self) -> AlertClass {
        match self {
            Alert::ConnectionLost | Alert::Blocked => AlertClass::Connectivity,
            Alert::AccountNotConnected | Alert::NoOperatorNumber => AlertClass::AccountConfiguration,
            Alert::OperatorOnGsm | Alert::WrongToNumber(_) => AlertClass::UsageWarning,
        }
    }

    /// Latched alerts come back every time the panel is activated
    pub fn is_latched(&self) -> bool {
        self.class() != AlertClass::UsageWarning
    }

    /// Whether the stream must be closed for good
    pub fn closes_stream(&self) -> bool {
        matches!(
            self,
            Alert::Blocked | Alert::AccountNotConnected | Alert::NoOperatorNumber
        )
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        let settings = || {
            Some(ErrorLink {
                url: SETTINGS_URL.to_string(),
                label: Some(SETTINGS_LABEL.to_string()),
            })
        };

        match self {
            Alert::ConnectionLost | Alert::Blocked => ErrorDescriptor {
                message: MSG_CONNECTION_LOST.to_string(),
                link: None,
                dismissible: false,
            },
            Alert::AccountNotConnected => ErrorDescriptor {
                message: MSG_ACCOUNT_NOT_CONNECTED.to_string(),
                link: settings(),
                dismissible: false,
            },
            Alert::NoOperatorNumber => ErrorDescriptor {
                message: MSG_NO_OPERATOR_NUMBER.to_string(),
                link: settings(),
                dismissible: false,
            },
            Alert::OperatorOnGsm => ErrorDescriptor {
                message: MSG_OPERATOR_ON_GSM.to_string(),
                link: settings(),
                dismissible: true,
            },
            Alert::WrongToNumber(to) => ErrorDescriptor {
                message: format!("Звонок на номер {} нельзя осуществить", to),
                link: None,
                dismissible: true,
            },
        }
    }
}
