//! Delivery transports: the single `send(topic, payload, options)` contract
//! every handler delivers through.

use async_trait::async_trait;
use safecity_core::config::{TransportConfig, TransportKind};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{TransportError, TransportSetupError};
use crate::types::{DeliveryOptions, DeliveryReceipt, NotificationPayload, Priority, Topic};

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn send(
        &self,
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
    ) -> Result<DeliveryReceipt, TransportError>;
}

/// Prints each delivery as one JSON line. Nothing reaches a device.
#[derive(Debug, Default)]
pub struct StdoutTransport {
    sent: AtomicU64,
}

impl StdoutTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryTransport for StdoutTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stdout
    }

    async fn send(
        &self,
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
    ) -> Result<DeliveryReceipt, TransportError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        let line = json!({
            "topic": topic,
            "payload": payload,
            "options": options,
        });
        println!("{line}");
        Ok(DeliveryReceipt(format!("stdout-{n}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    /// Read from the named environment variable on every send, so rotated
    /// tokens are picked up without a restart.
    Env(String),
    Static(String),
}

impl AccessToken {
    fn resolve(&self) -> Result<String, TransportError> {
        match self {
            AccessToken::Static(token) => Ok(token.clone()),
            AccessToken::Env(var) => match std::env::var(var) {
                Ok(token) if !token.trim().is_empty() => Ok(token),
                _ => Err(TransportError::Unauthorized {
                    message: format!("environment variable {var} is not set"),
                }),
            },
        }
    }
}

/// Firebase Cloud Messaging HTTP v1.
#[derive(Debug, Clone)]
pub struct FcmTransport {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    token: AccessToken,
    timeout_secs: u64,
}

impl FcmTransport {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        token: AccessToken,
        timeout_secs: u64,
    ) -> Result<Self, TransportSetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|source| TransportSetupError::Client { source })?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            token,
            timeout_secs,
        })
    }

    pub fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        )
    }

    /// Build the v1 `messages:send` request body.
    pub fn build_message(
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
    ) -> Value {
        let mut android = json!({
            "notification": {
                "channel_id": &options.android_channel_id,
                "click_action": &options.click_action,
            }
        });
        if options.priority == Priority::High {
            android["priority"] = Value::String("high".to_string());
            android["notification"]["notification_priority"] =
                Value::String("PRIORITY_HIGH".to_string());
        }

        let mut message = json!({
            "topic": topic,
            "notification": {
                "title": &payload.title,
                "body": &payload.body,
            },
            "android": android,
        });
        if !payload.data.is_empty() {
            message["data"] = json!(payload.data);
        }

        json!({ "message": message })
    }
}

#[async_trait]
impl DeliveryTransport for FcmTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Fcm
    }

    async fn send(
        &self,
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
    ) -> Result<DeliveryReceipt, TransportError> {
        validate_topic_name(topic)?;
        let token = self.token.resolve()?;
        let body = Self::build_message(topic, payload, options);

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error(err, self.timeout_secs))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| request_error(err, self.timeout_secs))?;

        if !(200..300).contains(&status) {
            return Err(classify_status(status, topic, text.trim()));
        }

        let name = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|value| value.get("name").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("fcm-{status}"));
        Ok(DeliveryReceipt(name))
    }
}

/// Posts `{topic, payload, options}` to a relay that owns the push credentials.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
    timeout_secs: u64,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, TransportSetupError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|source| TransportSetupError::Client { source })?;
        Ok(Self {
            client,
            url: url.into(),
            timeout_secs,
        })
    }

    pub fn build_body(
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
    ) -> Value {
        json!({
            "topic": topic,
            "payload": payload,
            "options": options,
        })
    }
}

#[async_trait]
impl DeliveryTransport for WebhookTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Webhook
    }

    async fn send(
        &self,
        topic: &Topic,
        payload: &NotificationPayload,
        options: &DeliveryOptions,
    ) -> Result<DeliveryReceipt, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::build_body(topic, payload, options))
            .send()
            .await
            .map_err(|err| request_error(err, self.timeout_secs))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| request_error(err, self.timeout_secs))?;

        if !(200..300).contains(&status) {
            return Err(classify_status(status, topic, text.trim()));
        }

        let id = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|value| value.get("id").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("http-{status}"));
        Ok(DeliveryReceipt(id))
    }
}

pub fn transport_from_config(
    config: &TransportConfig,
) -> Result<Arc<dyn DeliveryTransport>, TransportSetupError> {
    match config.kind {
        TransportKind::Stdout => Ok(Arc::new(StdoutTransport::new())),
        TransportKind::Fcm => {
            let project_id = config
                .fcm_project_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .ok_or(TransportSetupError::MissingSetting {
                    transport: "fcm",
                    setting: "fcm_project_id",
                })?;
            let transport = FcmTransport::new(
                config.fcm_endpoint.clone(),
                project_id,
                AccessToken::Env(config.fcm_token_env.clone()),
                config.timeout_secs,
            )?;
            Ok(Arc::new(transport))
        }
        TransportKind::Webhook => {
            let url = config
                .webhook_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .ok_or(TransportSetupError::MissingSetting {
                    transport: "webhook",
                    setting: "webhook_url",
                })?;
            Ok(Arc::new(WebhookTransport::new(url, config.timeout_secs)?))
        }
    }
}

/// Topic names accepted by the push platform: `[A-Za-z0-9-_.~%]+`.
pub fn validate_topic_name(topic: &Topic) -> Result<(), TransportError> {
    let name = topic.as_str();
    if name.is_empty() {
        return Err(TransportError::InvalidTopic {
            topic: name.to_string(),
            message: "topic name is empty".to_string(),
        });
    }
    if let Some(bad) = name
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~' | '%')))
    {
        return Err(TransportError::InvalidTopic {
            topic: name.to_string(),
            message: format!("character '{bad}' is not allowed"),
        });
    }
    Ok(())
}

pub fn classify_status(status: u16, topic: &Topic, body: &str) -> TransportError {
    let message = if body.is_empty() {
        format!("http status {status}")
    } else {
        body.to_string()
    };
    match status {
        401 | 403 => TransportError::Unauthorized { message },
        429 => TransportError::QuotaExceeded { message },
        400 | 404 if body.contains("topic") || body.contains("NOT_FOUND") => {
            TransportError::InvalidTopic {
                topic: topic.to_string(),
                message,
            }
        }
        _ => TransportError::Rejected { status, message },
    }
}

fn request_error(err: reqwest::Error, timeout_secs: u64) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { timeout_secs }
    } else {
        TransportError::Network {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use safecity_core::config::{TransportConfig, TransportKind};
    use std::collections::BTreeMap;

    use super::{
        classify_status, transport_from_config, validate_topic_name, AccessToken,
        DeliveryTransport, FcmTransport, StdoutTransport, WebhookTransport,
    };
    use crate::error::{TransportError, TransportSetupError};
    use crate::types::{DeliveryOptions, NotificationPayload, Priority, Topic};

    fn payload(with_data: bool) -> NotificationPayload {
        let mut data = BTreeMap::new();
        if with_data {
            data.insert("lat".to_string(), "33.5".to_string());
        }
        NotificationPayload {
            title: "⚠️ Nouveau : Incendie".to_string(),
            body: "Feu - Soyez prudents !".to_string(),
            data,
        }
    }

    #[test]
    fn fcm_message_carries_android_hints_and_data() {
        let message = FcmTransport::build_message(
            &Topic::incidents(),
            &payload(true),
            &DeliveryOptions::default(),
        );
        let inner = &message["message"];
        assert_eq!(inner["topic"], "incidents_all");
        assert_eq!(inner["notification"]["title"], "⚠️ Nouveau : Incendie");
        assert_eq!(inner["data"]["lat"], "33.5");
        assert_eq!(
            inner["android"]["notification"]["channel_id"],
            "safecity_alerts_channel"
        );
        assert_eq!(inner["android"]["notification"]["click_action"], "MainActivity");
        assert!(inner["android"].get("priority").is_none());
    }

    #[test]
    fn fcm_message_marks_high_priority_and_omits_empty_data() {
        let options = DeliveryOptions::default().with_priority(Priority::High);
        let message = FcmTransport::build_message(&Topic::official_alerts(), &payload(false), &options);
        let inner = &message["message"];
        assert_eq!(inner["android"]["priority"], "high");
        assert_eq!(
            inner["android"]["notification"]["notification_priority"],
            "PRIORITY_HIGH"
        );
        assert!(inner.get("data").is_none());
    }

    #[test]
    fn fcm_send_url_trims_trailing_slash() {
        let transport = FcmTransport::new(
            "https://fcm.example.test/",
            "safecity",
            AccessToken::Static("t".to_string()),
            5,
        )
        .expect("build transport");
        assert_eq!(
            transport.send_url(),
            "https://fcm.example.test/v1/projects/safecity/messages:send"
        );
        assert_eq!(transport.kind(), TransportKind::Fcm);
    }

    #[tokio::test]
    async fn fcm_refuses_invalid_topic_before_any_request() {
        let transport = FcmTransport::new(
            "http://127.0.0.1:9",
            "safecity",
            AccessToken::Static("t".to_string()),
            1,
        )
        .expect("build transport");
        let err = transport
            .send(
                &Topic("user_a b".to_string()),
                &payload(false),
                &DeliveryOptions::default(),
            )
            .await
            .expect_err("invalid topic");
        assert!(matches!(err, TransportError::InvalidTopic { .. }));
    }

    #[tokio::test]
    async fn fcm_without_token_is_unauthorized() {
        let transport = FcmTransport::new(
            "http://127.0.0.1:9",
            "safecity",
            AccessToken::Env("SAFECITY_TEST_TOKEN_THAT_IS_NEVER_SET".to_string()),
            1,
        )
        .expect("build transport");
        let err = transport
            .send(&Topic::incidents(), &payload(false), &DeliveryOptions::default())
            .await
            .expect_err("no token");
        assert!(matches!(err, TransportError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn stdout_transport_numbers_receipts() {
        let transport = StdoutTransport::new();
        let first = transport
            .send(&Topic::incidents(), &payload(true), &DeliveryOptions::default())
            .await
            .expect("first send");
        let second = transport
            .send(&Topic::incidents(), &payload(true), &DeliveryOptions::default())
            .await
            .expect("second send");
        assert_eq!(first.0, "stdout-1");
        assert_eq!(second.0, "stdout-2");
    }

    #[test]
    fn webhook_body_wraps_topic_payload_and_options() {
        let body = WebhookTransport::build_body(
            &Topic("user_42".to_string()),
            &payload(false),
            &DeliveryOptions::default(),
        );
        assert_eq!(body["topic"], "user_42");
        assert_eq!(body["payload"]["body"], "Feu - Soyez prudents !");
        assert_eq!(body["options"]["priority"], "normal");
    }

    #[test]
    fn topic_names_are_restricted_to_platform_alphabet() {
        assert!(validate_topic_name(&Topic("user_u-9.x~%20".to_string())).is_ok());
        assert!(validate_topic_name(&Topic(String::new())).is_err());
        assert!(validate_topic_name(&Topic("user_é".to_string())).is_err());
        assert!(validate_topic_name(&Topic("user/42".to_string())).is_err());
    }

    #[test]
    fn status_codes_map_to_error_classes() {
        let topic = Topic::incidents();
        assert!(matches!(
            classify_status(429, &topic, ""),
            TransportError::QuotaExceeded { .. }
        ));
        assert!(matches!(
            classify_status(401, &topic, "bad token"),
            TransportError::Unauthorized { .. }
        ));
        assert!(matches!(
            classify_status(400, &topic, "Invalid topic name"),
            TransportError::InvalidTopic { .. }
        ));
        assert!(matches!(
            classify_status(503, &topic, ""),
            TransportError::Rejected { status: 503, .. }
        ));
    }

    #[test]
    fn from_config_builds_configured_transport() {
        let stdout = transport_from_config(&TransportConfig::default()).expect("stdout");
        assert_eq!(stdout.kind(), TransportKind::Stdout);

        let fcm = transport_from_config(&TransportConfig {
            kind: TransportKind::Fcm,
            fcm_project_id: Some("safecity".to_string()),
            ..TransportConfig::default()
        })
        .expect("fcm");
        assert_eq!(fcm.kind(), TransportKind::Fcm);

        let webhook = transport_from_config(&TransportConfig {
            kind: TransportKind::Webhook,
            webhook_url: Some("http://relay.example.test/push".to_string()),
            ..TransportConfig::default()
        })
        .expect("webhook");
        assert_eq!(webhook.kind(), TransportKind::Webhook);
    }

    #[test]
    fn from_config_reports_missing_settings() {
        let err = transport_from_config(&TransportConfig {
            kind: TransportKind::Fcm,
            ..TransportConfig::default()
        })
        .err()
        .expect("missing project id");
        assert!(matches!(
            err,
            TransportSetupError::MissingSetting {
                setting: "fcm_project_id",
                ..
            }
        ));
    }
}
