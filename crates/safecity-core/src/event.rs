//! Document-creation events and the trigger patterns they are routed by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::EventId;

static EVENT_NONCE: AtomicU64 = AtomicU64::new(1);

pub type PathParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("trigger pattern must not be empty")]
    Empty,
    #[error("invalid trigger pattern segment '{segment}' in '{pattern}'")]
    InvalidSegment { pattern: String, segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A `collection/{param}` document path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl TriggerPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        for segment in split_segments(pattern) {
            if let Some(inner) = segment.strip_prefix('{') {
                let name = inner
                    .strip_suffix('}')
                    .filter(|name| !name.is_empty() && !name.contains(['{', '}']))
                    .ok_or_else(|| PatternError::InvalidSegment {
                        pattern: pattern.to_string(),
                        segment: segment.to_string(),
                    })?;
                segments.push(Segment::Param(name.to_string()));
            } else if segment.contains(['{', '}']) {
                return Err(PatternError::InvalidSegment {
                    pattern: pattern.to_string(),
                    segment: segment.to_string(),
                });
            } else {
                segments.push(Segment::Literal(segment.to_string()));
            }
        }

        if segments.is_empty() {
            return Err(PatternError::Empty);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Capture the path parameters of `path`, or `None` if it does not match.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let path_segments = split_segments(path);
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, value) in self.segments.iter().zip(path_segments) {
            match segment {
                Segment::Param(name) => {
                    params.insert(name.clone(), value.to_string());
                }
                Segment::Literal(literal) if literal == value => {}
                Segment::Literal(_) => return None,
            }
        }
        Some(params)
    }
}

impl std::fmt::Display for TriggerPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Field values of a stored document at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Only JSON objects are document snapshots.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A non-empty string field. Null, empty and non-string values count as absent.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::String(value)) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// A finite number, stored either as a JSON number or a numeric string.
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = match self.0.get(key)? {
            Value::Number(number) => number.as_f64()?,
            Value::String(text) => text.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A creation event as delivered by the document store, before routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEvent {
    /// Source-assigned id; redeliveries of one event carry the same id.
    #[serde(default)]
    pub event_id: Option<EventId>,
    /// Full document path, e.g. `incidents/abc123`.
    pub document: String,
    /// Anything other than a JSON object is read as a missing snapshot, so a
    /// malformed event is skipped instead of rejected and redelivered.
    #[serde(default, deserialize_with = "snapshot_or_none")]
    pub snapshot: Option<Snapshot>,
}

fn snapshot_or_none<'de, D>(deserializer: D) -> Result<Option<Snapshot>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(Snapshot::from_value))
}

impl DocumentEvent {
    pub fn new(document: impl Into<String>, snapshot: Option<Snapshot>) -> Self {
        Self {
            event_id: None,
            document: document.into(),
            snapshot,
        }
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }
}

/// A routed creation event, handed to exactly one dispatch handler.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationEvent {
    pub id: EventId,
    pub document: String,
    pub params: PathParams,
    pub snapshot: Option<Snapshot>,
    pub at: DateTime<Utc>,
}

impl CreationEvent {
    pub fn routed(event: DocumentEvent, params: PathParams) -> Self {
        let at = Utc::now();
        let id = event.event_id.unwrap_or_else(|| next_event_id(at));
        Self {
            id,
            document: event.document,
            params,
            snapshot: event.snapshot,
            at,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

fn next_event_id(at: DateTime<Utc>) -> EventId {
    let nonce = EVENT_NONCE.fetch_add(1, Ordering::Relaxed);
    EventId(format!("evt-{}-{nonce}", at.timestamp_millis()))
}
