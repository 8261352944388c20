use crate::columns::{Field, NOT_AVAILABLE};
use crate::errors::{AppError, AppResult};
use crate::models::{
    Record, TaskPayload, DEFAULT_TASK_PRIORITY, DEFAULT_TASK_STATUS, DEFAULT_TASK_TYPE, TASK_PRIORITIES,
    TASK_STATUSES,
};
use chrono::{DateTime, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditPhase {
    Unopened,
    Draft,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub task_id: String,
    pub task_type: String,
    pub title: String,
    pub assigned_to: String,
    pub deadline: NaiveDate,
    pub status: String,
    pub priority: String,
    pub notes: String,
}

impl TaskDraft {
    pub fn seed(record: &Record, today: NaiveDate) -> Self {
        let text = |field: Field| {
            let value = record.field(field);
            if value == NOT_AVAILABLE {
                String::new()
            } else {
                value.trim().to_string()
            }
        };
        let pick = |field: Field, options: &[&str], fallback: &str| {
            let value = record.field(field).trim();
            options
                .iter()
                .find(|option| **option == value)
                .unwrap_or(&fallback)
                .to_string()
        };
        let task_type = Some(text(Field::TaskType))
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TASK_TYPE.to_string());

        Self {
            task_id: record.id.clone(),
            task_type,
            title: text(Field::Title),
            assigned_to: text(Field::AssignedTo),
            deadline: parse_deadline(record.field(Field::Deadline)).unwrap_or(today),
            status: pick(Field::Status, TASK_STATUSES, DEFAULT_TASK_STATUS),
            priority: pick(Field::Priority, TASK_PRIORITIES, DEFAULT_TASK_PRIORITY),
            notes: text(Field::Notes),
        }
    }

    pub fn to_payload(&self) -> TaskPayload {
        TaskPayload {
            task_id: Some(self.task_id.clone()),
            task_type: self.task_type.clone(),
            title: self.title.clone(),
            assigned_to: self.assigned_to.clone(),
            deadline: self.deadline.format("%Y-%m-%d").to_string(),
            status: Some(self.status.clone()),
            priority: self.priority.clone(),
            notes: self.notes.clone(),
            timestamp: None,
        }
    }
}

pub fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw == NOT_AVAILABLE {
        return None;
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftEdit {
    Title(String),
    AssignedTo(String),
    Deadline(NaiveDate),
    Status(String),
    Priority(String),
    Notes(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum EditorState {
    #[default]
    Unopened,
    Draft(TaskDraft),
    Submitted(TaskDraft),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEditor {
    state: EditorState,
}

impl TaskEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> EditPhase {
        match self.state {
            EditorState::Unopened => EditPhase::Unopened,
            EditorState::Draft(_) => EditPhase::Draft,
            EditorState::Submitted(_) => EditPhase::Submitted,
        }
    }

    pub fn draft(&self) -> Option<&TaskDraft> {
        match &self.state {
            EditorState::Unopened => None,
            EditorState::Draft(draft) | EditorState::Submitted(draft) => Some(draft),
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.draft().map(|draft| draft.task_id.as_str())
    }

    /// Opens `record` for editing. Reopening the task already in draft keeps
    /// the edits; opening another task discards the previous draft.
    pub fn open(&mut self, record: &Record, today: NaiveDate) -> AppResult<&TaskDraft> {
        if record.id.is_empty() {
            return Err(AppError::DataShape("task has no id; Task ID column not found".to_string()));
        }
        match &self.state {
            EditorState::Submitted(_) => {
                return Err(AppError::validation("An update is already being submitted."));
            }
            EditorState::Draft(draft) if draft.task_id == record.id => {}
            EditorState::Draft(draft) => {
                tracing::debug!(from = %draft.task_id, to = %record.id, "switching edited task");
                self.state = EditorState::Draft(TaskDraft::seed(record, today));
            }
            EditorState::Unopened => {
                tracing::debug!(task_id = %record.id, "draft opened");
                self.state = EditorState::Draft(TaskDraft::seed(record, today));
            }
        }
        self.draft()
            .ok_or_else(|| AppError::Internal("draft missing after open".to_string()))
    }

    pub fn apply(&mut self, edit: DraftEdit) -> AppResult<()> {
        let EditorState::Draft(draft) = &mut self.state else {
            return Err(AppError::validation("No task is open for editing."));
        };
        match edit {
            DraftEdit::Title(title) => draft.title = title,
            DraftEdit::AssignedTo(assignee) => draft.assigned_to = assignee,
            DraftEdit::Deadline(deadline) => draft.deadline = deadline,
            DraftEdit::Status(status) => {
                ensure_option(&status, TASK_STATUSES, "status")?;
                draft.status = status;
            }
            DraftEdit::Priority(priority) => {
                ensure_option(&priority, TASK_PRIORITIES, "priority")?;
                draft.priority = priority;
            }
            DraftEdit::Notes(notes) => draft.notes = notes,
        }
        Ok(())
    }

    pub fn submit(&mut self) -> AppResult<TaskPayload> {
        match std::mem::take(&mut self.state) {
            EditorState::Draft(draft) => {
                let payload = draft.to_payload();
                self.state = EditorState::Submitted(draft);
                Ok(payload)
            }
            other => {
                self.state = other;
                Err(AppError::validation("No task draft to submit."))
            }
        }
    }

    /// Settles a submission: delivered discards the draft, failed restores it
    /// so the user can retry.
    pub fn resolve(&mut self, delivered: bool) {
        if let EditorState::Submitted(draft) = std::mem::take(&mut self.state) {
            if delivered {
                tracing::debug!(task_id = %draft.task_id, "draft submitted and discarded");
            } else {
                self.state = EditorState::Draft(draft);
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = EditorState::Unopened;
    }
}

fn ensure_option(value: &str, options: &[&str], label: &str) -> AppResult<()> {
    if options.contains(&value) {
        Ok(())
    } else {
        Err(AppError::validation(format!("Unknown {label} '{value}'.")))
    }
}
