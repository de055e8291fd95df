use safecity_core::types::{DocumentId, EventId, RecordKind};
use safecity_notify::{
    DeliveryResult, DispatchReport, DispatchStage, NotificationPayload, ReplaySummary,
    SkipReason, Topic, TransportError,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryView {
    pub topic: Topic,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TransportError>,
}

impl From<&DeliveryResult> for DeliveryView {
    fn from(result: &DeliveryResult) -> Self {
        match &result.outcome {
            Ok(receipt) => Self {
                topic: result.topic.clone(),
                status: DeliveryStatus::Delivered,
                receipt: Some(receipt.0.clone()),
                error: None,
            },
            Err(err) => Self {
                topic: result.topic.clone(),
                status: DeliveryStatus::Failed,
                receipt: None,
                error: Some(err.clone()),
            },
        }
    }
}

/// JSON shape of a dispatch report, returned by `POST /events` and printed
/// by `safecityd dispatch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    pub event_id: EventId,
    pub kind: RecordKind,
    pub document_id: DocumentId,
    pub stage: DispatchStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<NotificationPayload>,
    pub deliveries: Vec<DeliveryView>,
    pub delivered: usize,
    pub failed: usize,
}

impl From<&DispatchReport> for ReportView {
    fn from(report: &DispatchReport) -> Self {
        Self {
            event_id: report.event_id.clone(),
            kind: report.kind,
            document_id: report.document_id.clone(),
            stage: report.stage,
            skipped: report.skip_reason().cloned(),
            payload: report.payload.clone(),
            deliveries: report.deliveries().iter().map(DeliveryView::from).collect(),
            delivered: report.delivered(),
            failed: report.failed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayView {
    pub attempted: usize,
    pub delivered: usize,
    pub still_failing: usize,
}

impl From<&ReplaySummary> for ReplayView {
    fn from(summary: &ReplaySummary) -> Self {
        Self {
            attempted: summary.attempted,
            delivered: summary.delivered,
            still_failing: summary.failed.len(),
        }
    }
}
