use crate::columns::{Field, NOT_AVAILABLE};
use crate::editor::{EditPhase, TaskDraft};
use crate::filter;
use crate::models::{AgentStatus, ApprovalTarget, Notice, Record, Snapshot, SourceKind, PENDING_REVIEW};
use crate::session::SessionState;
use chrono::NaiveDate;
use serde::Serialize;

const EMAIL_DISPLAY_CHARS: usize = 25;
const OVERVIEW_LIST_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub label: &'static str,
    pub value: usize,
}

fn metric(label: &'static str, value: usize) -> Metric {
    Metric { label, value }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    fn from_records(headers: &[String], records: &[&Record]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: records.iter().map(|record| record.values().to_vec()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRow {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub email: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub deadline: String,
    pub assigned_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub agent: &'static str,
    pub description: &'static str,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewView {
    pub agents: Vec<AgentCard>,
    pub metrics: Vec<Metric>,
    pub recent_leads: TableView,
    pub high_priority_tasks: Vec<TaskSummary>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalView {
    pub kind: SourceKind,
    pub target: ApprovalTarget,
    pub metrics: Vec<Metric>,
    pub rows: Vec<LeadRow>,
    pub selected_count: usize,
    pub all_selected: bool,
    pub can_select: bool,
    pub approve_enabled: bool,
    pub approved_ids: Vec<String>,
    pub search: String,
    pub table: TableView,
    pub exportable: bool,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub id: String,
    pub task_type: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub assigned_to: String,
    pub deadline: String,
}

impl TaskDetails {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            task_type: record.field(Field::TaskType).to_string(),
            title: record.field(Field::Title).to_string(),
            status: record.field(Field::Status).to_string(),
            priority: record.field(Field::Priority).to_string(),
            assigned_to: record.field(Field::AssignedTo).to_string(),
            deadline: record.field(Field::Deadline).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEditorView {
    pub expanded: bool,
    pub task_id_search: String,
    pub options: Vec<TaskOption>,
    pub current: Option<TaskDetails>,
    pub draft: Option<TaskDraft>,
    pub phase: EditPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoardView {
    pub metrics: Vec<Metric>,
    pub editor: TaskEditorView,
    pub search: String,
    pub active: TableView,
    pub notices: Vec<Notice>,
}

pub fn overview(
    donors: &Snapshot,
    tasks: &Snapshot,
    agents: &[(SourceKind, AgentStatus)],
    mut notices: Vec<Notice>,
) -> OverviewView {
    let agents = agents
        .iter()
        .map(|(kind, status)| AgentCard {
            agent: kind.agent(),
            description: agent_description(*kind),
            status: *status,
        })
        .collect();

    let metrics = vec![
        metric("Pending Review", donors.len()),
        metric("Qualified Leads", filter::count_where(&donors.records, Field::Status, "Qualified")),
        metric("Contacted", filter::count_where(&donors.records, Field::Status, "Contacted")),
        metric("Pending Tasks", filter::count_where(&tasks.records, Field::Status, "New")),
    ];

    let recent: Vec<&Record> = donors.records.iter().take(OVERVIEW_LIST_LIMIT).collect();
    let high_priority_tasks = filter::high_priority_pending(&tasks.records, OVERVIEW_LIST_LIMIT)
        .into_iter()
        .map(|record| TaskSummary {
            id: record.id.clone(),
            title: record.field(Field::Title).to_string(),
            deadline: record.field(Field::Deadline).to_string(),
            assigned_to: record.field(Field::AssignedTo).to_string(),
        })
        .collect();

    if donors.is_empty() {
        notices.push(Notice::info("No recent leads. Run CORA to generate leads."));
    }
    if tasks.is_empty() {
        notices.push(Notice::info("No tasks available"));
    }

    OverviewView {
        agents,
        metrics,
        recent_leads: TableView::from_records(donors.headers(), &recent),
        high_priority_tasks,
        notices,
    }
}

pub fn pending_records(snapshot: &Snapshot) -> Vec<&Record> {
    if snapshot.has_field(Field::Status) {
        filter::partition_by_status(&snapshot.records, PENDING_REVIEW)
    } else {
        snapshot.records.iter().collect()
    }
}

pub fn displayed_records<'a>(snapshot: &'a Snapshot, query: &str) -> Vec<&'a Record> {
    match snapshot.kind {
        SourceKind::Tasks => filter::search(&snapshot.records, query),
        SourceKind::Leads | SourceKind::DonorProspects => filter::search(pending_records(snapshot), query),
    }
}

pub fn approvals(
    snapshot: &Snapshot,
    target: ApprovalTarget,
    state: &mut SessionState,
    today: NaiveDate,
    mut notices: Vec<Notice>,
) -> ApprovalView {
    let kind = snapshot.kind;
    let noun = target.noun();
    let pending = pending_records(snapshot);
    let can_select = snapshot.has_field(Field::Id);

    let selection = state.selection_mut(kind);
    if can_select {
        selection.sync_universe(pending.iter().map(|record| record.id.clone()));
    } else {
        selection.sync_universe(Vec::<String>::new());
    }
    let rows = pending
        .iter()
        .map(|record| LeadRow {
            id: display(record, Field::Id),
            name: display(record, Field::Name),
            organization: display(record, Field::Organization),
            email: shorten(&display(record, Field::Email), EMAIL_DISPLAY_CHARS),
            selected: selection.is_selected(&record.id),
        })
        .collect();
    let selected_count = selection.count();
    let all_selected = selection.all_selected();

    let search = state.search(kind).to_string();
    let shown = displayed_records(snapshot, &search);
    let table = TableView::from_records(snapshot.headers(), &shown);

    if snapshot.is_empty() {
        notices.push(Notice::info(format!(
            "No {} available. Run {} to generate leads.",
            plural(kind),
            kind.agent()
        )));
    } else if pending.is_empty() {
        notices.push(Notice::info(format!(
            "All {} have been reviewed! No pending approvals.",
            plural(kind)
        )));
    } else {
        if !can_select {
            notices.push(Notice::warning(format!(
                "{} column not found; selection is unavailable.",
                Field::Id.canonical(kind)
            )));
        }
        if table.is_empty() {
            notices.push(Notice::info(format!("No {noun}s match your search criteria.")));
        }
    }

    ApprovalView {
        kind,
        target,
        metrics: approval_metrics(kind, &pending, today),
        rows,
        selected_count,
        all_selected,
        can_select,
        approve_enabled: can_select && selected_count > 0,
        approved_ids: state.take_approved_ids(kind),
        search,
        exportable: !table.is_empty(),
        table,
        notices,
    }
}

pub fn task_board(snapshot: &Snapshot, state: &mut SessionState, mut notices: Vec<Notice>) -> TaskBoardView {
    let records = &snapshot.records;
    let metrics = vec![
        metric("Pending", filter::count_where(records, Field::Status, "New")),
        metric("In Progress", filter::count_where(records, Field::Status, "In Progress")),
        metric("High Priority", filter::count_where(records, Field::Priority, "High")),
        metric("Total Tasks", records.len()),
    ];

    // A draft for a task that vanished from the sheet cannot be submitted.
    // An unreadable sheet says nothing about which tasks exist.
    if snapshot.is_available() && state.editor.phase() == EditPhase::Draft {
        if let Some(task_id) = state.editor.task_id() {
            if snapshot.find(task_id).is_none() {
                tracing::debug!(task_id, "discarding draft for task missing from snapshot");
                state.editor.cancel();
            }
        }
    }

    let editable = snapshot.has_field(Field::Id) && snapshot.has_field(Field::Title);
    let mut options = Vec::new();
    if editable {
        let matching = filter::search_by_id(records, &state.task_id_search);
        if matching.is_empty() && !snapshot.is_empty() {
            notices.push(Notice::warning(format!(
                "No tasks found matching '{}'",
                state.task_id_search
            )));
        }
        options = matching
            .into_iter()
            .map(|record| TaskOption {
                id: record.id.clone(),
                label: format!("{} - {}", record.id, record.field(Field::Title)),
            })
            .collect();
    } else if !snapshot.is_empty() {
        notices.push(Notice::warning("Task ID or Title column not found in data"));
    }

    let current = state
        .editor
        .task_id()
        .and_then(|task_id| snapshot.find(task_id))
        .map(TaskDetails::from_record);
    let editor = TaskEditorView {
        expanded: !state.task_id_search.is_empty() || state.editor.draft().is_some(),
        task_id_search: state.task_id_search.clone(),
        options,
        current,
        draft: state.editor.draft().cloned(),
        phase: state.editor.phase(),
    };

    let search = state.search(SourceKind::Tasks).to_string();
    let shown = displayed_records(snapshot, &search);
    if snapshot.is_empty() {
        notices.push(Notice::info("No tasks found. Create your first task above."));
    }

    TaskBoardView {
        metrics,
        editor,
        search,
        active: TableView::from_records(snapshot.headers(), &shown),
        notices,
    }
}

fn approval_metrics(kind: SourceKind, pending: &[&Record], today: NaiveDate) -> Vec<Metric> {
    let today = today.format("%Y-%m-%d").to_string();
    let rows = || pending.iter().copied();
    let today_count = filter::count_containing(rows(), Field::Timestamp, &today);
    let mut metrics = vec![metric("Pending Review", pending.len()), metric("Today", today_count)];
    match kind {
        SourceKind::DonorProspects => {
            metrics.push(metric("Foundations", filter::count_containing(rows(), Field::DonorType, "Foundation")));
            metrics.push(metric("Corporates", filter::count_containing(rows(), Field::DonorType, "Corporate")));
        }
        SourceKind::Leads => {
            metrics.push(metric("Cities", filter::count_containing(rows(), Field::Organization, "City")));
            metrics.push(metric("Churches", filter::count_containing(rows(), Field::Organization, "Church")));
        }
        SourceKind::Tasks => {}
    }
    metrics
}

fn agent_description(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Leads => "Community Outreach Research Agent",
        SourceKind::DonorProspects => "Donor & Partner Prospecting Engine",
        SourceKind::Tasks => "Operations & Policy System",
    }
}

fn plural(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Leads => "leads",
        SourceKind::DonorProspects => "donor prospects",
        SourceKind::Tasks => "tasks",
    }
}

fn display(record: &Record, field: Field) -> String {
    let value = record.field(field);
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}
