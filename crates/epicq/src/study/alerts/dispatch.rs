use serde::{Deserialize, Serialize};

use super::domain::{Alert, AlertConfiguration, AlertSeverity};
use crate::study::domain::{AlertId, HospitalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    InApp,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Admin,
    Coordinator,
}

/// One outbound message about an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub alert_id: AlertId,
    pub hospital_id: HospitalId,
    pub channel: Channel,
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

/// Outbound delivery hook (e-mail provider, in-app inbox, push service).
pub trait NotificationDispatcher: Send + Sync {
    fn dispatch(&self, communication: Communication) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Messages owed for a freshly opened alert.
///
/// Every enabled recipient gets an in-app notice; e-mail follows when
/// `auto_send_email` is set, and critical alerts also push to the coordinator.
pub fn plan_communications(alert: &Alert, config: &AlertConfiguration) -> Vec<Communication> {
    let mut recipients = Vec::new();
    if config.notify_admin {
        recipients.push(Recipient::Admin);
    }
    if config.notify_coordinator {
        recipients.push(Recipient::Coordinator);
    }

    let mut communications = Vec::new();
    for recipient in recipients {
        let mut channels = vec![Channel::InApp];
        if config.auto_send_email {
            channels.push(Channel::Email);
        }
        if alert.severity == AlertSeverity::Critical && recipient == Recipient::Coordinator {
            channels.push(Channel::Push);
        }

        for channel in channels {
            communications.push(Communication {
                alert_id: alert.id.clone(),
                hospital_id: alert.hospital_id.clone(),
                channel,
                recipient,
                subject: alert.title.clone(),
                body: alert.message.clone(),
            });
        }
    }

    communications
}
