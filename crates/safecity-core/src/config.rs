//! Configuration for the dispatch daemon.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ANDROID_CHANNEL_ID: &str = "safecity_alerts_channel";
pub const DEFAULT_CLICK_ACTION: &str = "MainActivity";
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
pub const DEFAULT_FCM_TOKEN_ENV: &str = "FCM_ACCESS_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub android: AndroidConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8085".to_string(),
        }
    }
}

/// Delivery hints attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    pub channel_id: String,
    pub click_action: String,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            channel_id: DEFAULT_ANDROID_CHANNEL_ID.to_string(),
            click_action: DEFAULT_CLICK_ACTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Stdout,
    Fcm,
    Webhook,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stdout => "stdout",
            TransportKind::Fcm => "fcm",
            TransportKind::Webhook => "webhook",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub timeout_secs: u64,
    pub fcm_project_id: Option<String>,
    pub fcm_endpoint: String,
    /// Environment variable holding the OAuth2 access token.
    pub fcm_token_env: String,
    pub webhook_url: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Stdout,
            timeout_secs: 10,
            fcm_project_id: None,
            fcm_endpoint: DEFAULT_FCM_ENDPOINT.to_string(),
            fcm_token_env: DEFAULT_FCM_TOKEN_ENV.to_string(),
            webhook_url: None,
        }
    }
}

/// Where failed deliveries are recorded for manual replay. Disabled when unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

pub fn parse_dispatch_config(contents: &str) -> Result<DispatchConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn load_dispatch_config(path: impl AsRef<Path>) -> Result<DispatchConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_dispatch_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        load_dispatch_config, parse_dispatch_config, ConfigError, DispatchConfig, LogFormat,
        TransportKind, DEFAULT_ANDROID_CHANNEL_ID, DEFAULT_CLICK_ACTION,
    };
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_dispatch_config("").expect("parse empty config");
        assert_eq!(config, DispatchConfig::default());
        assert_eq!(config.android.channel_id, DEFAULT_ANDROID_CHANNEL_ID);
        assert_eq!(config.android.click_action, DEFAULT_CLICK_ACTION);
        assert_eq!(config.transport.kind, TransportKind::Stdout);
        assert!(config.journal.path.is_none());
    }

    #[test]
    fn parses_full_document() {
        let config = parse_dispatch_config(
            r#"
[server]
bind = "0.0.0.0:9000"

[android]
channel_id = "safecity_alerts_channel"
click_action = "MainActivity"

[transport]
kind = "fcm"
timeout_secs = 5
fcm_project_id = "safecity-prod"

[journal]
path = ".safecity/failed.jsonl"

[logging]
level = "debug"
format = "json"
"#,
        )
        .expect("parse config");

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.transport.kind, TransportKind::Fcm);
        assert_eq!(config.transport.timeout_secs, 5);
        assert_eq!(config.transport.fcm_project_id.as_deref(), Some("safecity-prod"));
        assert_eq!(config.transport.fcm_token_env, "FCM_ACCESS_TOKEN");
        assert_eq!(
            config.journal.path,
            Some(PathBuf::from(".safecity/failed.jsonl"))
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn bundled_example_config_parses() {
        let config = parse_dispatch_config(include_str!("../../../config/safecity.toml"))
            .expect("parse bundled config");
        assert_eq!(config.transport.kind, TransportKind::Stdout);
        assert_eq!(config.android.channel_id, DEFAULT_ANDROID_CHANNEL_ID);
        assert!(config.journal.path.is_some());
    }

    #[test]
    fn rejects_unknown_transport_kind() {
        let err = parse_dispatch_config("[transport]\nkind = \"pigeon\"\n")
            .expect_err("unknown transport kind");
        assert!(err.to_string().contains("pigeon") || err.to_string().contains("variant"));
    }

    #[test]
    fn load_reports_path_on_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.toml");
        let err = load_dispatch_config(&path).expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { ref path, .. } if path.ends_with("missing.toml")));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("safecity.toml");
        fs::write(&path, "[transport]\nkind = \"webhook\"\nwebhook_url = \"http://relay\"\n")
            .expect("write config");
        let config = load_dispatch_config(&path).expect("load config");
        assert_eq!(config.transport.kind, TransportKind::Webhook);
        assert_eq!(config.transport.webhook_url.as_deref(), Some("http://relay"));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[server\n").expect("write config");
        let err = load_dispatch_config(&path).expect_err("broken file");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }
}
