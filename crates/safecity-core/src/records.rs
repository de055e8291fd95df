//! Stored records, read leniently from creation snapshots.
//!
//! Extraction never fails: a field that is absent, null, empty or of the
//! wrong type is `None`, and each record exposes its class-specific default.

use serde::{Deserialize, Serialize};

use crate::event::Snapshot;
use crate::types::{RecipientId, RecordKind};

pub const DEFAULT_INCIDENT_CATEGORY: &str = "Incident";
pub const DEFAULT_INCIDENT_DESCRIPTION: &str = "Nouvel incident signalé.";
pub const DEFAULT_ALERT_TITLE: &str = "Alerte Officielle";
pub const DEFAULT_ALERT_MESSAGE: &str = "Message important des autorités.";

/// Stored field names, as written by the mobile client.
pub mod fields {
    pub const CATEGORY: &str = "nomCategorie";
    pub const DESCRIPTION: &str = "description";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const TITLE: &str = "titre";
    pub const MESSAGE: &str = "message";
    pub const RECIPIENT: &str = "idDestinataire";
    pub const SOURCE_INCIDENT: &str = "idIncidentSource";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub category: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl IncidentRecord {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            category: snapshot.text(fields::CATEGORY).map(str::to_string),
            description: snapshot.text(fields::DESCRIPTION).map(str::to_string),
            latitude: snapshot.number(fields::LATITUDE),
            longitude: snapshot.number(fields::LONGITUDE),
        }
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_INCIDENT_CATEGORY)
    }

    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or(DEFAULT_INCIDENT_DESCRIPTION)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficialAlertRecord {
    pub title: Option<String>,
    pub message: Option<String>,
}

impl OfficialAlertRecord {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            title: snapshot.text(fields::TITLE).map(str::to_string),
            message: snapshot.text(fields::MESSAGE).map(str::to_string),
        }
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_ALERT_TITLE)
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_ALERT_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectNotificationRecord {
    pub recipient_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub source_incident_id: Option<String>,
}

impl DirectNotificationRecord {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            recipient_id: snapshot.text(fields::RECIPIENT).map(str::to_string),
            title: snapshot.text(fields::TITLE).map(str::to_string),
            body: snapshot.text(fields::MESSAGE).map(str::to_string),
            source_incident_id: snapshot.text(fields::SOURCE_INCIDENT).map(str::to_string),
        }
    }

    /// The required recipient; `None` makes the record undeliverable.
    pub fn recipient(&self) -> Option<RecipientId> {
        self.recipient_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| RecipientId(id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Incident(IncidentRecord),
    OfficialAlert(OfficialAlertRecord),
    DirectNotification(DirectNotificationRecord),
}

impl Record {
    pub fn from_snapshot(kind: RecordKind, snapshot: &Snapshot) -> Self {
        match kind {
            RecordKind::Incident => Record::Incident(IncidentRecord::from_snapshot(snapshot)),
            RecordKind::OfficialAlert => {
                Record::OfficialAlert(OfficialAlertRecord::from_snapshot(snapshot))
            }
            RecordKind::DirectNotification => {
                Record::DirectNotification(DirectNotificationRecord::from_snapshot(snapshot))
            }
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Incident(_) => RecordKind::Incident,
            Record::OfficialAlert(_) => RecordKind::OfficialAlert,
            Record::DirectNotification(_) => RecordKind::DirectNotification,
        }
    }

    /// Name of the first missing required field, if any.
    pub fn missing_required_field(&self) -> Option<&'static str> {
        match self {
            Record::DirectNotification(record) if record.recipient().is_none() => {
                Some(fields::RECIPIENT)
            }
            _ => None,
        }
    }
}

/// Coordinates are forwarded as text; an absent one becomes an empty string.
pub fn coordinate_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
