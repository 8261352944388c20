use crate::errors::{AppError, AppResult};
use crate::models::{ApprovalTarget, SourceKind};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_WEBHOOK_BASE_URL: &str = "https://hackett2k.app.n8n.cloud/webhook";
pub const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_ACTOR_LABEL: &str = "Dashboard User";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const KEYRING_SERVICE: &str = "ops-command-center";
pub const KEYRING_SHEETS_USER: &str = "sheets-api";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    #[default]
    CsvExport,
    SheetsApi,
    Connector,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub use_keyring: bool,
    pub cora_range: Option<String>,
    pub daphne_range: Option<String>,
    pub opsi_range: Option<String>,
}

impl SheetsApiConfig {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_SHEETS_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn range_for(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::Leads => self.cora_range.as_deref(),
            SourceKind::DonorProspects => self.daphne_range.as_deref(),
            SourceKind::Tasks => self.opsi_range.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub base_url: Option<String>,
    pub lead_approval: Option<String>,
    pub donor_approval: Option<String>,
    pub task_create: Option<String>,
    pub task_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEndpoints {
    pub lead_approval: String,
    pub donor_approval: String,
    pub task_create: String,
    pub task_update: String,
}

impl WebhookEndpoints {
    pub fn approval(&self, target: ApprovalTarget) -> &str {
        match target {
            ApprovalTarget::Leads => &self.lead_approval,
            ApprovalTarget::Donors => &self.donor_approval,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub cora_sheet_url: Option<String>,
    pub daphne_sheet_url: Option<String>,
    pub opsi_sheet_url: Option<String>,
    pub transport: TransportKind,
    pub sheets_api: SheetsApiConfig,
    pub webhooks: WebhookConfig,
    pub actor_label: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::info!(path = %path.display(), "secrets file not found, using defaults");
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading secrets file {}", path.display()))
            .map_err(|error| AppError::Config(format!("{error:#}")))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = non_empty("CORA_SHEET_URL") {
            self.cora_sheet_url = Some(value);
        }
        if let Some(value) = non_empty("DAPHNE_SHEET_URL") {
            self.daphne_sheet_url = Some(value);
        }
        if let Some(value) = non_empty("OPSI_SHEET_URL") {
            self.opsi_sheet_url = Some(value);
        }
        if let Some(value) = non_empty("SHEETS_API_KEY") {
            self.sheets_api.api_key = Some(value);
        }
        if let Some(value) = non_empty("MARK_WEBHOOK_URL") {
            self.webhooks.lead_approval = Some(value);
        }
        if let Some(value) = non_empty("DIANA_WEBHOOK_URL") {
            self.webhooks.donor_approval = Some(value);
        }
        if let Some(value) = non_empty("OPSI_CREATE_WEBHOOK_URL") {
            self.webhooks.task_create = Some(value);
        }
        if let Some(value) = non_empty("OPSI_UPDATE_WEBHOOK_URL") {
            self.webhooks.task_update = Some(value);
        }
    }

    pub fn sheet_url(&self, kind: SourceKind) -> Option<&str> {
        let value = match kind {
            SourceKind::Leads => self.cora_sheet_url.as_deref(),
            SourceKind::DonorProspects => self.daphne_sheet_url.as_deref(),
            SourceKind::Tasks => self.opsi_sheet_url.as_deref(),
        };
        value.map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn actor_label(&self) -> &str {
        self.actor_label
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .unwrap_or(DEFAULT_ACTOR_LABEL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS).max(1))
    }

    pub fn webhook_endpoints(&self) -> WebhookEndpoints {
        let base = self
            .webhooks
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_WEBHOOK_BASE_URL)
            .trim_end_matches('/');
        let pick = |value: &Option<String>, path: &str| {
            value
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| format!("{base}/{path}"))
        };
        WebhookEndpoints {
            lead_approval: pick(&self.webhooks.lead_approval, "mark-approve-leads"),
            donor_approval: pick(&self.webhooks.donor_approval, "diana-approve-donors"),
            task_create: pick(&self.webhooks.task_create, "opsi-create-task"),
            task_update: pick(&self.webhooks.task_update, "opsi-update-task"),
        }
    }
}

pub fn keyring_sheets_token() -> AppResult<Option<String>> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_SHEETS_USER)
        .map_err(|error| AppError::Io(error.to_string()))?;
    match entry.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(error) => Err(AppError::Io(error.to_string())),
    }
}
