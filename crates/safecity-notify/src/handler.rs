//! One dispatch handler per triggering collection.
//!
//! A handler turns a single creation event into deliveries:
//! `received -> validated -> built -> resolved -> dispatching -> completed`.
//! Every failure is terminal and logged where it is detected; `handle`
//! cannot fail, so the event source never sees an error and never retries
//! on our account. Handlers hold no state between invocations.

use safecity_core::config::TransportKind;
use safecity_core::event::{CreationEvent, PatternError, TriggerPattern};
use safecity_core::records::Record;
use safecity_core::types::{DocumentId, EventId, RecordKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;

use crate::builder::build_payload;
use crate::error::TransportError;
use crate::journal::{FailedDelivery, ReplayJournal};
use crate::resolver::resolve_topics;
use crate::transport::DeliveryTransport;
use crate::types::{DeliveryOptions, DeliveryReceipt, NotificationPayload, Priority, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    Received,
    Validated,
    Built,
    Resolved,
    Dispatching,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The event carried no snapshot.
    MissingEventData,
    /// A required field was absent; the record can never be delivered.
    MissingField { field: &'static str },
    /// Nothing to deliver to.
    NoTopics,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub topic: Topic,
    pub outcome: Result<DeliveryReceipt, TransportError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    Dispatched(Vec<DeliveryResult>),
}

/// What one invocation did. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_id: EventId,
    pub kind: RecordKind,
    pub document_id: DocumentId,
    pub stage: DispatchStage,
    pub payload: Option<NotificationPayload>,
    pub outcome: DispatchOutcome,
}

impl DispatchReport {
    fn skipped(
        event: &CreationEvent,
        kind: RecordKind,
        document_id: DocumentId,
        stage: DispatchStage,
        reason: SkipReason,
    ) -> Self {
        Self {
            event_id: event.id.clone(),
            kind,
            document_id,
            stage,
            payload: None,
            outcome: DispatchOutcome::Skipped(reason),
        }
    }

    pub fn deliveries(&self) -> &[DeliveryResult] {
        match &self.outcome {
            DispatchOutcome::Dispatched(results) => results,
            DispatchOutcome::Skipped(_) => &[],
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.outcome {
            DispatchOutcome::Skipped(reason) => Some(reason),
            DispatchOutcome::Dispatched(_) => None,
        }
    }

    pub fn delivered(&self) -> usize {
        self.deliveries()
            .iter()
            .filter(|result| result.outcome.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries().len() - self.delivered()
    }

    /// Some targets received the notification and some did not.
    pub fn is_partial(&self) -> bool {
        self.delivered() > 0 && self.failed() > 0
    }
}

pub struct DispatchHandler {
    kind: RecordKind,
    trigger: TriggerPattern,
    transport: Arc<dyn DeliveryTransport>,
    options: DeliveryOptions,
    journal: Option<Arc<ReplayJournal>>,
}

impl std::fmt::Debug for DispatchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandler")
            .field("kind", &self.kind)
            .field("trigger", &self.trigger.as_str())
            .field("transport", &self.transport.kind())
            .field("journal", &self.journal.as_ref().map(|j| j.path().to_path_buf()))
            .finish()
    }
}

impl DispatchHandler {
    /// Bind `kind`'s collection trigger to `transport`. `options` carries the
    /// channel and click action; priority is decided per kind.
    pub fn new(
        kind: RecordKind,
        transport: Arc<dyn DeliveryTransport>,
        options: DeliveryOptions,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            kind,
            trigger: TriggerPattern::parse(kind.trigger())?,
            transport,
            options,
            journal: None,
        })
    }

    pub fn with_journal(mut self, journal: Arc<ReplayJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn trigger(&self) -> &TriggerPattern {
        &self.trigger
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        let priority = match self.kind {
            RecordKind::OfficialAlert => Priority::High,
            RecordKind::Incident | RecordKind::DirectNotification => self.options.priority,
        };
        self.options.clone().with_priority(priority)
    }

    pub async fn handle(&self, event: CreationEvent) -> DispatchReport {
        let document_id = self.document_id(&event);
        let span = tracing::info_span!(
            "dispatch",
            kind = %self.kind,
            event_id = %event.id,
            document_id = %document_id,
        );
        self.run(event, document_id).instrument(span).await
    }

    async fn run(&self, event: CreationEvent, document_id: DocumentId) -> DispatchReport {
        let kind = self.kind;

        let Some(snapshot) = event.snapshot.as_ref() else {
            tracing::info!("event carried no snapshot; nothing to dispatch");
            return DispatchReport::skipped(
                &event,
                kind,
                document_id,
                DispatchStage::Received,
                SkipReason::MissingEventData,
            );
        };

        let record = Record::from_snapshot(kind, snapshot);
        if let Some(field) = record.missing_required_field() {
            tracing::warn!(field, "required field missing; notification skipped");
            return DispatchReport::skipped(
                &event,
                kind,
                document_id,
                DispatchStage::Validated,
                SkipReason::MissingField { field },
            );
        }

        let payload = build_payload(&record, &document_id);
        let topics = resolve_topics(&record);
        if topics.is_empty() {
            tracing::warn!("record resolved to no topics; notification skipped");
            return DispatchReport::skipped(
                &event,
                kind,
                document_id,
                DispatchStage::Built,
                SkipReason::NoTopics,
            );
        }
        tracing::debug!(title = %payload.title, topics = topics.len(), "payload built");

        let options = self.delivery_options();
        let mut results = Vec::with_capacity(topics.len());
        for topic in topics {
            let outcome = self.transport.send(&topic, &payload, &options).await;
            match &outcome {
                Ok(receipt) => {
                    tracing::info!(topic = %topic, receipt = %receipt, "notification delivered");
                }
                Err(err) => {
                    tracing::error!(
                        topic = %topic,
                        transport = %self.transport.kind(),
                        error = %err,
                        "delivery failed; not retried"
                    );
                    self.journal_failure(&event, &document_id, &topic, &payload, &options, err)
                        .await;
                }
            }
            results.push(DeliveryResult { topic, outcome });
        }

        let report = DispatchReport {
            event_id: event.id.clone(),
            kind,
            document_id,
            stage: DispatchStage::Completed,
            payload: Some(payload),
            outcome: DispatchOutcome::Dispatched(results),
        };
        if report.is_partial() {
            tracing::warn!(
                delivered = report.delivered(),
                failed = report.failed(),
                "partial fan-out"
            );
        }
        report
    }

    fn document_id(&self, event: &CreationEvent) -> DocumentId {
        let id = event
            .param(self.kind.id_param())
            .or_else(|| event.document.rsplit('/').find(|segment| !segment.is_empty()))
            .unwrap_or_default();
        DocumentId::new(id)
    }

    /// The append is blocking file IO, so it runs on the blocking pool and
    /// is awaited before the invocation completes.
    async fn journal_failure(
        &self,
        event: &CreationEvent,
        document_id: &DocumentId,
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
        error: &TransportError,
    ) {
        let Some(journal) = &self.journal else {
            return;
        };
        let entry = FailedDelivery {
            at: chrono::Utc::now(),
            event_id: event.id.clone(),
            kind: self.kind,
            document_id: document_id.clone(),
            topic: topic.clone(),
            payload: payload.clone(),
            options: options.clone(),
            error: error.clone(),
        };
        let writer = Arc::clone(journal);
        let outcome = tokio::task::spawn_blocking(move || writer.append(&entry)).await;
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(err) => err.to_string(),
        };
        tracing::warn!(
            journal = %journal.path().display(),
            error = %failure,
            "could not record failed delivery"
        );
    }
}
