use crate::columns::{self, ColumnMap, Field};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const TASK_TYPES: &[&str] = &[
    "RFP Submission",
    "Contract Renewal",
    "Audit",
    "Compliance Report",
    "Other",
];
pub const TASK_STATUSES: &[&str] = &["New", "In Progress", "Completed", "On Hold", "Cancelled"];
pub const TASK_PRIORITIES: &[&str] = &["High", "Medium", "Low"];
pub const LEAD_STATUSES: &[&str] = &["pending review", "approved", "contacted", "qualified"];
pub const PENDING_REVIEW: &str = "pending review";
pub const DEFAULT_TASK_TYPE: &str = "RFP Submission";
pub const DEFAULT_TASK_STATUS: &str = "New";
pub const DEFAULT_TASK_PRIORITY: &str = "Medium";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Leads,
    DonorProspects,
    Tasks,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [Self::Leads, Self::DonorProspects, Self::Tasks];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Leads => "leads",
            Self::DonorProspects => "donor-prospects",
            Self::Tasks => "tasks",
        }
    }

    pub fn agent(self) -> &'static str {
        match self {
            Self::Leads => "CORA",
            Self::DonorProspects => "DAPHNE",
            Self::Tasks => "OPSI",
        }
    }

    pub fn secret_name(self) -> &'static str {
        match self {
            Self::Leads => "CORA_SHEET_URL",
            Self::DonorProspects => "DAPHNE_SHEET_URL",
            Self::Tasks => "OPSI_SHEET_URL",
        }
    }

    pub fn cache_ttl(self) -> Duration {
        match self {
            Self::Leads | Self::DonorProspects => Duration::from_secs(300),
            Self::Tasks => Duration::from_secs(60),
        }
    }

    pub fn approval_target(self) -> Option<ApprovalTarget> {
        match self {
            Self::Leads => Some(ApprovalTarget::Leads),
            Self::DonorProspects => Some(ApprovalTarget::Donors),
            Self::Tasks => None,
        }
    }

    pub fn export_prefix(self) -> &'static str {
        match self {
            Self::Leads => "cora_leads",
            Self::DonorProspects => "daphne_prospects",
            Self::Tasks => "opsi_tasks",
        }
    }

    pub fn searchable_fields(self) -> &'static [Field] {
        match self {
            Self::Leads | Self::DonorProspects => &[Field::Name, Field::Email, Field::Organization],
            Self::Tasks => &[Field::Title, Field::AssignedTo, Field::TaskType],
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalTarget {
    Leads,
    Donors,
}

impl ApprovalTarget {
    pub fn payload_key(self) -> &'static str {
        match self {
            Self::Leads => "approved_leads",
            Self::Donors => "approved_donors",
        }
    }

    pub fn agent(self) -> &'static str {
        match self {
            Self::Leads => "MARK",
            Self::Donors => "DIANA",
        }
    }

    pub fn noun(self) -> &'static str {
        match self {
            Self::Leads => "lead",
            Self::Donors => "prospect",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: SourceKind,
    pub id: String,
    values: Vec<String>,
    columns: Arc<ColumnMap>,
}

impl Record {
    pub(crate) fn new(kind: SourceKind, values: Vec<String>, columns: Arc<ColumnMap>) -> Self {
        let mut record = Self {
            kind,
            id: String::new(),
            values,
            columns,
        };
        let id = columns::field(&record, Field::Id);
        record.id = if id == columns::NOT_AVAILABLE {
            String::new()
        } else {
            id.trim().to_string()
        };
        record
    }

    pub fn from_pairs(kind: SourceKind, pairs: &[(&str, &str)]) -> Self {
        let headers = pairs.iter().map(|(header, _)| header.to_string()).collect();
        let values = pairs.iter().map(|(_, value)| value.to_string()).collect();
        Self::new(kind, values, Arc::new(ColumnMap::new(kind, headers)))
    }

    pub fn field(&self, field: Field) -> &str {
        columns::field(self, field)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    pub fn raw(&self, header: &str) -> Option<&str> {
        self.columns
            .headers()
            .iter()
            .position(|candidate| candidate == header)
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub kind: SourceKind,
    pub columns: Arc<ColumnMap>,
    pub records: Vec<Record>,
    pub fetched_at: DateTime<Utc>,
    pub load_error: Option<String>,
}

impl Snapshot {
    pub fn empty(kind: SourceKind) -> Self {
        Self {
            kind,
            columns: Arc::new(ColumnMap::new(kind, Vec::new())),
            records: Vec::new(),
            fetched_at: Utc::now(),
            load_error: None,
        }
    }

    /// Stand-in for a sheet that could not be read. Its emptiness says
    /// nothing about the sheet's rows.
    pub fn unavailable(kind: SourceKind, message: impl Into<String>) -> Self {
        Self {
            load_error: Some(message.into()),
            ..Self::empty(kind)
        }
    }

    pub fn is_available(&self) -> bool {
        self.load_error.is_none()
    }

    pub fn headers(&self) -> &[String] {
        self.columns.headers()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.columns.index_of(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn find(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| !record.id.is_empty() && record.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| !record.id.is_empty())
            .map(|record| record.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Active,
    Idle,
    Offline,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Idle => "Idle",
            Self::Offline => "Offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub task_type: String,
    pub title: String,
    pub assigned_to: String,
    pub deadline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub priority: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Input of the create-task form. `None` for the select boxes means the
/// placeholder option is still chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    pub title: String,
    pub task_type: Option<String>,
    pub assigned_to: String,
    pub deadline: NaiveDate,
    pub priority: Option<String>,
    pub notes: String,
}

impl TaskForm {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Task title is required.".to_string());
        }
        if !is_option(self.task_type.as_deref(), TASK_TYPES) {
            errors.push("Task type is required.".to_string());
        }
        if !is_option(self.priority.as_deref(), TASK_PRIORITIES) {
            errors.push("Priority is required.".to_string());
        }
        if self.assigned_to.trim().is_empty() {
            errors.push("Assigned To is required.".to_string());
        }
        errors
    }

    pub fn into_payload(self, task_id: String, timestamp: DateTime<Utc>) -> TaskPayload {
        TaskPayload {
            task_id: Some(task_id),
            task_type: self.task_type.unwrap_or_else(|| DEFAULT_TASK_TYPE.to_string()),
            title: self.title.trim().to_string(),
            assigned_to: self.assigned_to.trim().to_string(),
            deadline: self.deadline.format("%Y-%m-%d").to_string(),
            status: Some(DEFAULT_TASK_STATUS.to_string()),
            priority: self.priority.unwrap_or_else(|| DEFAULT_TASK_PRIORITY.to_string()),
            notes: self.notes,
            timestamp: Some(timestamp.to_rfc3339()),
        }
    }
}

fn is_option(value: Option<&str>, options: &[&str]) -> bool {
    value.is_some_and(|value| options.contains(&value))
}
