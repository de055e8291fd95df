//! Shape a stored record into the notification the client renders.

use safecity_core::records::{
    coordinate_text, DirectNotificationRecord, IncidentRecord, OfficialAlertRecord, Record,
};
use safecity_core::types::DocumentId;
use std::collections::BTreeMap;

use crate::types::{data_keys, NotificationPayload};

pub const INCIDENT_TITLE_PREFIX: &str = "⚠️ Nouveau : ";
pub const INCIDENT_BODY_SUFFIX: &str = " - Soyez prudents !";
pub const ALERT_TITLE_PREFIX: &str = "🚨 ";

/// Build the payload for a record. Pure and infallible; absent optional
/// fields fall back to class defaults. Required fields are checked by the
/// caller beforehand.
pub fn build_payload(record: &Record, document_id: &DocumentId) -> NotificationPayload {
    match record {
        Record::Incident(incident) => incident_payload(incident, document_id),
        Record::OfficialAlert(alert) => official_alert_payload(alert),
        Record::DirectNotification(direct) => direct_payload(direct),
    }
}

fn incident_payload(record: &IncidentRecord, document_id: &DocumentId) -> NotificationPayload {
    let mut data = BTreeMap::new();
    data.insert(
        data_keys::LATITUDE.to_string(),
        coordinate_text(record.latitude),
    );
    data.insert(
        data_keys::LONGITUDE.to_string(),
        coordinate_text(record.longitude),
    );
    data.insert(data_keys::INCIDENT_ID.to_string(), document_id.0.clone());

    NotificationPayload {
        title: format!("{INCIDENT_TITLE_PREFIX}{}", record.category_or_default()),
        body: format!("{}{INCIDENT_BODY_SUFFIX}", record.description_or_default()),
        data,
    }
}

fn official_alert_payload(record: &OfficialAlertRecord) -> NotificationPayload {
    NotificationPayload {
        title: format!("{ALERT_TITLE_PREFIX}{}", record.title_or_default()),
        body: record.message_or_default().to_string(),
        data: BTreeMap::new(),
    }
}

fn direct_payload(record: &DirectNotificationRecord) -> NotificationPayload {
    let mut data = BTreeMap::new();
    // Always present; the client reads it unconditionally.
    data.insert(
        data_keys::SOURCE_INCIDENT_ID.to_string(),
        record.source_incident_id.clone().unwrap_or_default(),
    );

    NotificationPayload {
        title: record.title.clone().unwrap_or_default(),
        body: record.body.clone().unwrap_or_default(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use safecity_core::event::Snapshot;
    use safecity_core::records::{
        DirectNotificationRecord, IncidentRecord, OfficialAlertRecord, Record,
    };
    use safecity_core::types::{DocumentId, RecordKind};
    use serde_json::json;

    use super::build_payload;

    fn doc() -> DocumentId {
        DocumentId::new("inc-1")
    }

    #[test]
    fn incident_title_and_body_wrap_category_and_description() {
        let record = Record::Incident(IncidentRecord {
            category: Some("Vol".to_string()),
            description: Some("Sac arraché".to_string()),
            latitude: Some(34.02),
            longitude: Some(-6.84),
        });
        let payload = build_payload(&record, &doc());
        assert_eq!(payload.title, "⚠️ Nouveau : Vol");
        assert_eq!(payload.body, "Sac arraché - Soyez prudents !");
        assert_eq!(payload.data["lat"], "34.02");
        assert_eq!(payload.data["lng"], "-6.84");
        assert_eq!(payload.data["incidentId"], "inc-1");
    }

    #[test]
    fn incident_without_fields_uses_defaults() {
        let record = Record::from_snapshot(RecordKind::Incident, &Snapshot::default());
        let payload = build_payload(&record, &doc());
        assert_eq!(payload.title, "⚠️ Nouveau : Incident");
        assert_eq!(payload.body, "Nouvel incident signalé. - Soyez prudents !");
        assert_eq!(payload.data["lat"], "");
        assert_eq!(payload.data["lng"], "");
        assert_eq!(payload.data.len(), 3);
    }

    #[test]
    fn official_alert_prefixes_title_verbatim_and_has_no_data() {
        let record = Record::OfficialAlert(OfficialAlertRecord {
            title: Some("Coupure d'eau".to_string()),
            message: Some("Quartier Maarif, 14h-18h".to_string()),
        });
        let payload = build_payload(&record, &doc());
        assert_eq!(payload.title, "🚨 Coupure d'eau");
        assert_eq!(payload.body, "Quartier Maarif, 14h-18h");
        assert!(payload.data.is_empty());
    }

    #[test]
    fn official_alert_defaults() {
        let snapshot = Snapshot::from_value(json!({ "titre": null })).expect("object");
        let record = Record::from_snapshot(RecordKind::OfficialAlert, &snapshot);
        let payload = build_payload(&record, &doc());
        assert_eq!(payload.title, "🚨 Alerte Officielle");
        assert_eq!(payload.body, "Message important des autorités.");
    }

    #[test]
    fn direct_notification_copies_text_and_always_sets_source_key() {
        let with_source = Record::DirectNotification(DirectNotificationRecord {
            recipient_id: Some("u9".to_string()),
            title: Some("Mise à jour".to_string()),
            body: Some("Votre signalement a été traité".to_string()),
            source_incident_id: Some("inc123".to_string()),
        });
        let payload = build_payload(&with_source, &doc());
        assert_eq!(payload.title, "Mise à jour");
        assert_eq!(payload.body, "Votre signalement a été traité");
        assert_eq!(payload.data["idIncidentSource"], "inc123");

        let without_source = Record::DirectNotification(DirectNotificationRecord {
            recipient_id: Some("u9".to_string()),
            title: Some("Bonjour".to_string()),
            body: None,
            source_incident_id: None,
        });
        let payload = build_payload(&without_source, &doc());
        assert_eq!(payload.body, "");
        assert_eq!(
            payload.data.get("idIncidentSource").map(String::as_str),
            Some("")
        );
    }
}
