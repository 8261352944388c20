use crate::models::{Record, SourceKind};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Id,
    Name,
    Organization,
    Email,
    Status,
    Priority,
    Deadline,
    AssignedTo,
    Notes,
    Title,
    TaskType,
    Timestamp,
    DonorType,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Self::Id,
        Self::Name,
        Self::Organization,
        Self::Email,
        Self::Status,
        Self::Priority,
        Self::Deadline,
        Self::AssignedTo,
        Self::Notes,
        Self::Title,
        Self::TaskType,
        Self::Timestamp,
        Self::DonorType,
    ];

    pub fn canonical(self, kind: SourceKind) -> &'static str {
        match self {
            Self::Id => match kind {
                SourceKind::Leads => "Lead ID",
                SourceKind::DonorProspects => "Donor ID",
                SourceKind::Tasks => "Task ID",
            },
            Self::Name => "Name",
            Self::Organization => "Organization",
            Self::Email => "Email",
            Self::Status => "Status",
            Self::Priority => "Priority",
            Self::Deadline => "Deadline",
            Self::AssignedTo => "AssignedTo",
            Self::Notes => "Notes",
            Self::Title => "Title",
            Self::TaskType => "TaskType",
            Self::Timestamp => "Timestamp",
            Self::DonorType => "DonorType",
        }
    }

    pub fn synonyms(self, kind: SourceKind) -> &'static [&'static str] {
        SYNONYMS
            .get(&(self, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

static SYNONYMS: Lazy<HashMap<(Field, SourceKind), Vec<&'static str>>> = Lazy::new(|| {
    let shared: &[(Field, &[&str])] = &[
        (Field::Name, &["name", "Full Name", "Contact Name"]),
        (Field::Organization, &["organization", "Org", "Company"]),
        (Field::Email, &["email", "Email Address", "E-mail"]),
        (Field::Status, &["status", "Lead Status"]),
        (Field::Priority, &["priority"]),
        (Field::Deadline, &["Deadline Date", "deadline", "Due Date"]),
        (Field::AssignedTo, &["Assigned To", "assignedTo", "Assignee"]),
        (Field::Notes, &["notes", "Note"]),
        (Field::Title, &["Task Title", "title"]),
        (Field::TaskType, &["Task Type", "taskType", "Type"]),
        (Field::Timestamp, &["timestamp", "Created At", "Date Added"]),
        (Field::DonorType, &["Donor Type", "donor_type"]),
    ];
    let ids: &[(SourceKind, &[&str])] = &[
        (SourceKind::Leads, &["LeadID", "lead_id", "ID"]),
        (SourceKind::DonorProspects, &["DonorID", "donor_id", "ID"]),
        (SourceKind::Tasks, &["OPSI ID", "taskId", "TaskID", "ID"]),
    ];

    let mut table = HashMap::new();
    for kind in SourceKind::ALL {
        for (field, names) in shared {
            table.insert((*field, kind), names.to_vec());
        }
    }
    for (kind, names) in ids {
        table.insert((Field::Id, *kind), names.to_vec());
    }
    table
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    kind: SourceKind,
    headers: Vec<String>,
    resolved: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn new(kind: SourceKind, headers: Vec<String>) -> Self {
        let resolved = Field::ALL
            .iter()
            .filter_map(|field| resolve(&headers, *field, kind).map(|index| (*field, index)))
            .collect();
        Self {
            kind,
            headers,
            resolved,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.resolved.get(&field).copied()
    }

    pub fn header_of(&self, field: Field) -> Option<&str> {
        self.index_of(field)
            .and_then(|index| self.headers.get(index))
            .map(String::as_str)
    }
}

/// Finds the header index for `field`.
///
/// Order: exact canonical name, canonical name with trailing whitespace,
/// each synonym (exact, then trailing whitespace), then a loose comparison
/// that ignores case, spacing, underscores and hyphens. The first header in
/// sheet order wins within each step.
pub fn resolve(headers: &[String], field: Field, kind: SourceKind) -> Option<usize> {
    let canonical = field.canonical(kind);
    let synonyms = field.synonyms(kind);

    let mut candidates = Vec::with_capacity(synonyms.len() + 1);
    candidates.push(canonical);
    candidates.extend_from_slice(synonyms);

    for candidate in &candidates {
        if let Some(index) = headers.iter().position(|header| header == candidate) {
            return Some(index);
        }
        if let Some(index) = headers
            .iter()
            .position(|header| header.trim_end() == *candidate)
        {
            return Some(index);
        }
    }

    for candidate in &candidates {
        let wanted = loose_key(candidate);
        if let Some(index) = headers.iter().position(|header| loose_key(header) == wanted) {
            return Some(index);
        }
    }

    None
}

pub fn field(record: &Record, field: Field) -> &str {
    record
        .columns()
        .index_of(field)
        .and_then(|index| record.values().get(index))
        .map(String::as_str)
        .unwrap_or(NOT_AVAILABLE)
}

fn loose_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
