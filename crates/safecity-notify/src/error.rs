use serde::{Deserialize, Serialize};

/// A delivery attempt the transport rejected or could not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    #[error("transport is disabled: {transport}")]
    Disabled { transport: String },
    #[error("transport is not authorized: {message}")]
    Unauthorized { message: String },
    #[error("invalid topic '{topic}': {message}")]
    InvalidTopic { topic: String, message: String },
    #[error("delivery quota exceeded: {message}")]
    QuotaExceeded { message: String },
    #[error("delivery timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("network error: {message}")]
    Network { message: String },
    #[error("delivery rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Raised while building a transport from configuration.
#[derive(Debug, thiserror::Error)]
pub enum TransportSetupError {
    #[error("{transport} transport requires `{setting}`")]
    MissingSetting {
        transport: &'static str,
        setting: &'static str,
    },
    #[error("failed to build http client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },
}

/// Raised when an event names a document no handler is registered for.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no handler registered for document '{document}'")]
    UnknownCollection { document: String },
}
