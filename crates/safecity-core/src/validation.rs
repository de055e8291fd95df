//! Validation for dispatch configuration.

use serde::{Deserialize, Serialize};

use crate::config::{DispatchConfig, TransportKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for DispatchConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.server.bind.trim().is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "server.bind.empty",
                message: "server bind address must not be empty".to_string(),
            });
        }

        if self.android.channel_id.trim().is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "android.channel_id.empty",
                message: "android channel id must not be empty; clients only render known channels"
                    .to_string(),
            });
        }

        if self.android.click_action.trim().is_empty() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "android.click_action.empty",
                message: "click action is empty; tapping a notification will not open the app"
                    .to_string(),
            });
        }

        if self.transport.timeout_secs == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "transport.timeout.zero",
                message: "transport timeout cannot be 0".to_string(),
            });
        }

        match self.transport.kind {
            TransportKind::Fcm => {
                let missing_project = self
                    .transport
                    .fcm_project_id
                    .as_deref()
                    .map(str::trim)
                    .map_or(true, str::is_empty);
                if missing_project {
                    issues.push(ValidationIssue {
                        level: ValidationLevel::Error,
                        code: "transport.fcm_project_id.missing",
                        message: "fcm transport requires fcm_project_id".to_string(),
                    });
                }
                if self.transport.fcm_token_env.trim().is_empty() {
                    issues.push(ValidationIssue {
                        level: ValidationLevel::Error,
                        code: "transport.fcm_token_env.empty",
                        message: "fcm transport requires fcm_token_env".to_string(),
                    });
                }
            }
            TransportKind::Webhook => {
                let url = self.transport.webhook_url.as_deref().map(str::trim);
                match url {
                    None | Some("") => issues.push(ValidationIssue {
                        level: ValidationLevel::Error,
                        code: "transport.webhook_url.missing",
                        message: "webhook transport requires webhook_url".to_string(),
                    }),
                    Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                        issues.push(ValidationIssue {
                            level: ValidationLevel::Error,
                            code: "transport.webhook_url.scheme",
                            message: format!("webhook_url must be http(s), got '{url}'"),
                        })
                    }
                    Some(_) => {}
                }
            }
            TransportKind::Stdout => {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    code: "transport.stdout",
                    message: "stdout transport only prints payloads; nothing reaches devices"
                        .to_string(),
                });
            }
        }

        if self.journal.path.is_none() {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "journal.disabled",
                message: "no failed-delivery journal configured; failures are only logged"
                    .to_string(),
            });
        }

        issues
    }
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues
        .iter()
        .any(|issue| issue.level == ValidationLevel::Error)
}
