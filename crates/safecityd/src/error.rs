use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use safecity_core::config::ConfigError;
use safecity_core::event::PatternError;
use safecity_notify::{JournalError, RouteError, TransportSetupError};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("config validation failed ({0})")]
    InvalidConfig(String),
    #[error("failed to initialize logging: {0}")]
    Telemetry(String),
    #[error(transparent)]
    Transport(#[from] TransportSetupError),
    #[error(transparent)]
    Trigger(#[from] PatternError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error("no journal configured; pass --journal or set [journal] path")]
    NoJournal,
    #[error("failed to read snapshot {path}: {source}")]
    ReadSnapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse snapshot {path}: {source}")]
    ParseSnapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot {path} is not a JSON object")]
    SnapshotShape { path: PathBuf },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {source}")]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced by the HTTP ingress.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("dispatch task aborted: {message}")]
    Aborted { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Route(RouteError::UnknownCollection { .. }) => StatusCode::NOT_FOUND,
            ApiError::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
