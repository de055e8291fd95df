//! Core identifiers and record kinds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Id of the document whose creation fired the trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientId(pub String);

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecipientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Record class, one per triggering collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Incident,
    OfficialAlert,
    DirectNotification,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Incident,
        RecordKind::OfficialAlert,
        RecordKind::DirectNotification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Incident => "incident",
            RecordKind::OfficialAlert => "official_alert",
            RecordKind::DirectNotification => "direct_notification",
        }
    }

    /// Document path pattern the handler for this kind is registered against.
    pub fn trigger(self) -> &'static str {
        match self {
            RecordKind::Incident => "incidents/{incidentId}",
            RecordKind::OfficialAlert => "official_alerts/{alertId}",
            RecordKind::DirectNotification => "notifications/{notificationId}",
        }
    }

    pub fn id_param(self) -> &'static str {
        match self {
            RecordKind::Incident => "incidentId",
            RecordKind::OfficialAlert => "alertId",
            RecordKind::DirectNotification => "notificationId",
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "incident" => Ok(RecordKind::Incident),
            "official_alert" => Ok(RecordKind::OfficialAlert),
            "direct_notification" => Ok(RecordKind::DirectNotification),
            other => Err(format!(
                "invalid record kind '{other}'. valid values: incident, official_alert, direct_notification"
            )),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
