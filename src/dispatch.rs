use crate::config::WebhookEndpoints;
use crate::errors::{AppError, AppResult};
use crate::models::{ApprovalTarget, TaskPayload};
use crate::redaction::redact;
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

const MAX_DETAIL_CHARS: usize = 500;
pub const TASK_ID_PREFIX: &str = "OPSI-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DispatchFailure {
    Status { code: u16, body: String },
    Timeout { seconds: u64 },
    Network { message: String },
    InvalidResponse { message: String },
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { code, body } if body.is_empty() => write!(f, "HTTP {code}"),
            Self::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            Self::Timeout { seconds } => write!(f, "no response within {seconds}s"),
            Self::Network { message } => write!(f, "{message}"),
            Self::InvalidResponse { message } => write!(f, "unreadable response: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome<T> {
    Delivered(T),
    Failed(DispatchFailure),
}

impl<T> DispatchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    pub fn failure(&self) -> Option<&DispatchFailure> {
        match self {
            Self::Delivered(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DispatchOutcome<U> {
        match self {
            Self::Delivered(value) => DispatchOutcome::Delivered(f(value)),
            Self::Failed(failure) => DispatchOutcome::Failed(failure),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Delivered(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalReceipt {
    pub target: ApprovalTarget,
    pub approved_ids: Vec<String>,
    pub response_body: String,
}

pub struct ActionDispatcher {
    client: reqwest::Client,
    endpoints: WebhookEndpoints,
    timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(endpoints: WebhookEndpoints, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    pub fn endpoints(&self) -> &WebhookEndpoints {
        &self.endpoints
    }

    pub async fn approve(
        &self,
        target: ApprovalTarget,
        ids: &[String],
        actor_label: &str,
    ) -> AppResult<DispatchOutcome<ApprovalReceipt>> {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Err(AppError::validation(format!(
                "Please select at least one {} to approve.",
                target.noun()
            )));
        }

        let mut body = serde_json::Map::new();
        body.insert(target.payload_key().to_string(), serde_json::json!(ids));
        body.insert("approved_by".to_string(), serde_json::json!(actor_label));
        body.insert(
            "timestamp".to_string(),
            serde_json::json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        let url = self.endpoints.approval(target);
        tracing::info!(agent = target.agent(), count = ids.len(), "dispatching approval");

        Ok(match self.post_json(url, &body).await {
            Ok(response_body) => DispatchOutcome::Delivered(ApprovalReceipt {
                target,
                approved_ids: ids,
                response_body,
            }),
            Err(failure) => {
                tracing::warn!(agent = target.agent(), failure = %failure, "approval dispatch failed");
                DispatchOutcome::Failed(failure)
            }
        })
    }

    pub async fn approve_leads(&self, ids: &[String], actor_label: &str) -> AppResult<DispatchOutcome<ApprovalReceipt>> {
        self.approve(ApprovalTarget::Leads, ids, actor_label).await
    }

    pub async fn approve_donors(&self, ids: &[String], actor_label: &str) -> AppResult<DispatchOutcome<ApprovalReceipt>> {
        self.approve(ApprovalTarget::Donors, ids, actor_label).await
    }

    pub async fn create_task(&self, payload: &TaskPayload) -> AppResult<DispatchOutcome<serde_json::Value>> {
        validate_task(payload, false)?;
        tracing::info!(task_id = payload.task_id.as_deref().unwrap_or(""), "dispatching task create");
        Ok(self.post_task(&self.endpoints.task_create, payload).await)
    }

    pub async fn update_task(&self, payload: &TaskPayload) -> AppResult<DispatchOutcome<serde_json::Value>> {
        validate_task(payload, true)?;
        tracing::info!(task_id = payload.task_id.as_deref().unwrap_or(""), "dispatching task update");
        Ok(self.post_task(&self.endpoints.task_update, payload).await)
    }

    async fn post_task(&self, url: &str, payload: &TaskPayload) -> DispatchOutcome<serde_json::Value> {
        let body = match self.post_json(url, payload).await {
            Ok(body) => body,
            Err(failure) => {
                tracing::warn!(failure = %failure, "task webhook failed");
                return DispatchOutcome::Failed(failure);
            }
        };
        match serde_json::from_str(&body) {
            Ok(value) => DispatchOutcome::Delivered(value),
            Err(error) => {
                let failure = DispatchFailure::InvalidResponse {
                    message: error.to_string(),
                };
                tracing::warn!(failure = %failure, "task webhook reply was not JSON");
                DispatchOutcome::Failed(failure)
            }
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<String, DispatchFailure> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|error| self.classify(error))?;
        let code = response.status().as_u16();
        let text = response.text().await.map_err(|error| self.classify(error))?;
        if code != 200 {
            return Err(DispatchFailure::Status {
                code,
                body: truncate(&redact(text.trim()), MAX_DETAIL_CHARS),
            });
        }
        Ok(text)
    }

    fn classify(&self, error: reqwest::Error) -> DispatchFailure {
        if error.is_timeout() {
            DispatchFailure::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            DispatchFailure::Network {
                message: redact(&error.to_string()),
            }
        }
    }
}

fn validate_task(payload: &TaskPayload, is_update: bool) -> AppResult<()> {
    let mut errors = Vec::new();
    if is_update && payload.task_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        errors.push("Task ID is required.".to_string());
    }
    if payload.title.trim().is_empty() {
        errors.push("Task title is required.".to_string());
    }
    if NaiveDate::parse_from_str(&payload.deadline, "%Y-%m-%d").is_err() {
        errors.push(format!("Deadline '{}' is not a YYYY-MM-DD date.", payload.deadline));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn generate_task_id(now: DateTime<Local>) -> String {
    format!("{TASK_ID_PREFIX}{}", now.format("%Y%m%d%H%M%S"))
}

pub fn assigned_task_id(body: &serde_json::Value, fallback: &str) -> String {
    ["taskId", "task_id", "Task ID"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|value| value.as_str()))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
