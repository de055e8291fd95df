use safecity_core::config::AndroidConfig;
use safecity_core::types::RecipientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INCIDENTS_TOPIC: &str = "incidents_all";
pub const OFFICIAL_ALERTS_TOPIC: &str = "official_alerts";
pub const USER_TOPIC_PREFIX: &str = "user_";

/// Client-observable keys of the payload data map.
pub mod data_keys {
    pub const LATITUDE: &str = "lat";
    pub const LONGITUDE: &str = "lng";
    pub const INCIDENT_ID: &str = "incidentId";
    pub const SOURCE_INCIDENT_ID: &str = "idIncidentSource";
}

/// A named delivery channel clients subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(pub String);

impl Topic {
    pub fn incidents() -> Self {
        Self(INCIDENTS_TOPIC.to_string())
    }

    pub fn official_alerts() -> Self {
        Self(OFFICIAL_ALERTS_TOPIC.to_string())
    }

    /// Per-recipient topic; the client subscribes to its own at startup.
    pub fn for_recipient(recipient: &RecipientId) -> Self {
        Self(format!("{USER_TOPIC_PREFIX}{}", recipient.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        !self.0.starts_with(USER_TOPIC_PREFIX)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

/// Transport-level hints; not part of the payload the client renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOptions {
    pub priority: Priority,
    pub android_channel_id: String,
    pub click_action: String,
}

impl DeliveryOptions {
    pub fn from_android(android: &AndroidConfig) -> Self {
        Self {
            priority: Priority::Normal,
            android_channel_id: android.channel_id.clone(),
            click_action: android.click_action.clone(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self::from_android(&AndroidConfig::default())
    }
}

/// Identifier the transport returned for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryReceipt(pub String);

impl std::fmt::Display for DeliveryReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
