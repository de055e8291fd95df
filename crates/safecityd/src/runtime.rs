//! Wiring from configuration to a ready dispatch registry.

use safecity_core::config::{load_dispatch_config, DispatchConfig};
use safecity_core::validation::{Validate, ValidationIssue, ValidationLevel};
use safecity_notify::{
    replay, transport_from_config, DeliveryTransport, HandlerRegistry, ReplayJournal,
    ReplaySummary,
};
use std::path::Path;
use std::sync::Arc;

use crate::error::DaemonError;

pub const DEFAULT_CONFIG_PATH: &str = "config/safecity.toml";

/// Load `path`, or defaults when no path was given and the default file is
/// absent. An explicitly named file must exist.
pub fn load_config(path: Option<&Path>) -> Result<DispatchConfig, DaemonError> {
    match path {
        Some(path) => Ok(load_dispatch_config(path)?),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Ok(load_dispatch_config(default_path)?)
            } else {
                Ok(DispatchConfig::default())
            }
        }
    }
}

/// Fail on error-level issues; log warnings.
pub fn check_issues(issues: &[ValidationIssue]) -> Result<(), DaemonError> {
    for issue in issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Warning)
    {
        tracing::warn!(code = issue.code, "{}", issue.message);
    }

    let errors = issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Error)
        .map(|issue| format!("{}: {}", issue.code, issue.message))
        .collect::<Vec<_>>();
    if errors.is_empty() {
        return Ok(());
    }
    Err(DaemonError::InvalidConfig(errors.join("; ")))
}

pub fn journal_from_config(config: &DispatchConfig) -> Option<Arc<ReplayJournal>> {
    config
        .journal
        .path
        .as_ref()
        .map(|path| Arc::new(ReplayJournal::new(path.clone())))
}

/// Validate `config` and build the standard handler set on its transport.
pub fn build_registry(config: &DispatchConfig) -> Result<HandlerRegistry, DaemonError> {
    check_issues(&config.validate())?;
    let transport = transport_from_config(&config.transport)?;
    let journal = journal_from_config(config);
    tracing::info!(
        transport = %transport.kind(),
        journal = journal.is_some(),
        "dispatch handlers ready"
    );
    Ok(HandlerRegistry::standard(
        transport,
        &config.android,
        journal,
    )?)
}

/// Claim the journal, resend each entry once and put back what still fails.
/// Failures journaled by a running daemon meanwhile are left untouched.
pub async fn replay_claimed(
    journal: &ReplayJournal,
    transport: &dyn DeliveryTransport,
) -> Result<ReplaySummary, DaemonError> {
    let mut claimed = journal.claim()?;
    let summary = replay(claimed.take_entries(), transport).await;
    journal.restore(claimed, &summary.failed)?;
    tracing::info!(
        journal = %journal.path().display(),
        attempted = summary.attempted,
        delivered = summary.delivered,
        still_failing = summary.failed.len(),
        "replay finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use safecity_core::config::{parse_dispatch_config, TransportKind};
    use safecity_core::types::{DocumentId, EventId, RecordKind};
    use safecity_core::validation::{ValidationIssue, ValidationLevel};
    use safecity_notify::{
        DeliveryOptions, DeliveryReceipt, DeliveryTransport, FailedDelivery, NotificationPayload,
        ReplayJournal, Topic, TransportError,
    };
    use std::fs;

    use super::{build_registry, check_issues, journal_from_config, load_config, replay_claimed};
    use crate::error::DaemonError;

    /// Delivers user topics, rejects everything else.
    struct UserTopicsOnly;

    #[async_trait]
    impl DeliveryTransport for UserTopicsOnly {
        fn kind(&self) -> TransportKind {
            TransportKind::Webhook
        }

        async fn send(
            &self,
            topic: &Topic,
            _payload: &NotificationPayload,
            _options: &DeliveryOptions,
        ) -> Result<DeliveryReceipt, TransportError> {
            if topic.is_broadcast() {
                return Err(TransportError::Rejected {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(DeliveryReceipt("ok".to_string()))
        }
    }

    fn failed(topic: Topic) -> FailedDelivery {
        FailedDelivery {
            at: Utc::now(),
            event_id: EventId::new("evt-1"),
            kind: RecordKind::DirectNotification,
            document_id: DocumentId::new(topic.as_str()),
            topic,
            payload: NotificationPayload {
                title: "t".to_string(),
                body: "b".to_string(),
                data: Default::default(),
            },
            options: DeliveryOptions::default(),
            error: TransportError::Timeout { timeout_secs: 10 },
        }
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(dir.path().join("missing.toml").as_path())).expect_err("missing");
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("safecity.toml");
        fs::write(&path, "[server]\nbind = \"0.0.0.0:9000\"\n").expect("write config");

        let config = load_config(Some(path.as_path())).expect("load");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.transport.kind, TransportKind::Stdout);
    }

    #[test]
    fn warnings_pass_and_errors_block() {
        let warning = ValidationIssue {
            level: ValidationLevel::Warning,
            code: "journal.disabled",
            message: "no journal".to_string(),
        };
        check_issues(&[warning.clone()]).expect("warnings only");

        let error = ValidationIssue {
            level: ValidationLevel::Error,
            code: "server.bind.empty",
            message: "bind must not be empty".to_string(),
        };
        let err = check_issues(&[warning, error]).expect_err("error issue");
        assert_eq!(
            err.to_string(),
            "config validation failed (server.bind.empty: bind must not be empty)"
        );
    }

    #[test]
    fn default_config_builds_stdout_registry() {
        let config = parse_dispatch_config("").expect("parse");
        assert!(journal_from_config(&config).is_none());
        let registry = build_registry(&config).expect("registry");
        assert_eq!(registry.kinds(), RecordKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn replay_keeps_only_still_failing_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = ReplayJournal::new(dir.path().join("failed.jsonl"));
        journal
            .append(&failed(Topic("user_u9".to_string())))
            .expect("append");
        journal.append(&failed(Topic::incidents())).expect("append");

        let summary = replay_claimed(&journal, &UserTopicsOnly).await.expect("replay");
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.delivered, 1);

        let left = journal.load().expect("load");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].topic, Topic::incidents());
        assert!(!journal.claim_path().exists());
    }

    #[tokio::test]
    async fn replay_of_missing_journal_attempts_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = ReplayJournal::new(dir.path().join("absent.jsonl"));
        let summary = replay_claimed(&journal, &UserTopicsOnly).await.expect("replay");
        assert_eq!(summary.attempted, 0);
    }

    #[test]
    fn fcm_without_project_is_rejected_before_building() {
        let config = parse_dispatch_config("[transport]\nkind = \"fcm\"\n").expect("parse");
        let err = build_registry(&config).expect_err("invalid config");
        assert!(err.to_string().contains("transport.fcm_project_id.missing"));
    }
}
