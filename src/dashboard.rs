use crate::config::DashboardConfig;
use crate::dispatch::{assigned_task_id, generate_task_id, ActionDispatcher, ApprovalReceipt, DispatchOutcome};
use crate::editor::{DraftEdit, TaskDraft};
use crate::errors::{AppError, AppResult};
use crate::export::{export_csv, CsvExport};
use crate::models::{AgentStatus, ApprovalTarget, Notice, Record, Snapshot, SourceKind, TaskForm};
use crate::session::{SessionManager, SessionState};
use crate::sources::{build_transport, SheetSource, SheetTransport};
use crate::views::{self, ApprovalView, OverviewView, TaskBoardView};
use chrono::{Local, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub task_id: String,
    pub response: serde_json::Value,
}

pub struct CommandCenter {
    config: DashboardConfig,
    sources: SheetSource,
    dispatcher: ActionDispatcher,
    sessions: SessionManager,
}

impl CommandCenter {
    pub fn from_config(config: DashboardConfig) -> AppResult<Arc<Self>> {
        let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
        let transport = build_transport(&config, client)?;
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: DashboardConfig, transport: Arc<dyn SheetTransport>) -> AppResult<Arc<Self>> {
        let dispatcher = ActionDispatcher::new(config.webhook_endpoints(), config.timeout())?;
        let sources = SheetSource::new(transport, &config);
        for kind in SourceKind::ALL {
            if !sources.is_configured(kind) {
                tracing::warn!(source = %kind, secret = kind.secret_name(), "sheet location not configured");
            }
        }
        tracing::info!(transport = sources.transport_name(), "command center ready");
        Ok(Arc::new(Self {
            config,
            sources,
            dispatcher,
            sessions: SessionManager::new(),
        }))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn sources(&self) -> &SheetSource {
        &self.sources
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn open_session(&self) -> String {
        self.sessions.open_session().await
    }

    pub async fn close_session(&self, session_id: &str) {
        self.sessions.close_session(session_id).await;
    }

    pub async fn overview(&self, session_id: &str) -> AppResult<OverviewView> {
        let donors = self.sources.fetch(SourceKind::DonorProspects).await;
        let tasks = self.sources.fetch(SourceKind::Tasks).await;
        let agents: Vec<(SourceKind, AgentStatus)> = SourceKind::ALL
            .iter()
            .map(|kind| {
                let status = if self.sources.is_configured(*kind) {
                    AgentStatus::Active
                } else {
                    AgentStatus::Offline
                };
                (*kind, status)
            })
            .collect();
        let notices = self.notices(session_id, &[&*donors, &*tasks]).await?;
        Ok(views::overview(&donors, &tasks, &agents, notices))
    }

    pub async fn approvals(&self, session_id: &str, kind: SourceKind) -> AppResult<ApprovalView> {
        let target = approval_target(kind)?;
        let snapshot = self.sources.fetch(kind).await;
        let notices = self.notices(session_id, &[&*snapshot]).await?;
        let today = Local::now().date_naive();
        self.sessions
            .with_session(session_id, |state| views::approvals(&snapshot, target, state, today, notices))
            .await
    }

    pub async fn task_board(&self, session_id: &str) -> AppResult<TaskBoardView> {
        let snapshot = self.sources.fetch(SourceKind::Tasks).await;
        let notices = self.notices(session_id, &[&*snapshot]).await?;
        self.sessions
            .with_session(session_id, |state| views::task_board(&snapshot, state, notices))
            .await
    }

    pub async fn toggle_selection(&self, session_id: &str, kind: SourceKind, id: &str) -> AppResult<Option<bool>> {
        self.sessions
            .with_session(session_id, |state| state.selection_mut(kind).toggle(id))
            .await
    }

    pub async fn select_all(&self, session_id: &str, kind: SourceKind, checked: bool) -> AppResult<usize> {
        self.sessions
            .with_session(session_id, |state| {
                let selection = state.selection_mut(kind);
                selection.select_all(checked);
                selection.count()
            })
            .await
    }

    pub async fn set_search(&self, session_id: &str, kind: SourceKind, query: &str) -> AppResult<()> {
        self.sessions
            .with_session(session_id, |state| state.set_search(kind, query))
            .await
    }

    pub async fn set_task_id_search(&self, session_id: &str, query: &str) -> AppResult<()> {
        self.sessions
            .with_session(session_id, |state| state.task_id_search = query.to_string())
            .await
    }

    pub async fn approve_selected(
        &self,
        session_id: &str,
        kind: SourceKind,
    ) -> AppResult<DispatchOutcome<ApprovalReceipt>> {
        let target = approval_target(kind)?;
        let ids = self
            .sessions
            .with_session(session_id, |state| state.selection_mut(kind).selected_ids())
            .await?;

        let outcome = match self.dispatcher.approve(target, &ids, self.config.actor_label()).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.flash_validation(session_id, &error).await?;
                return Err(error);
            }
        };

        let agent = target.agent();
        match &outcome {
            DispatchOutcome::Delivered(receipt) => {
                let count = receipt.approved_ids.len();
                let approved = receipt.approved_ids.clone();
                self.sessions
                    .with_session(session_id, |state| {
                        state.selection_mut(kind).clear();
                        state.set_approved_ids(kind, approved);
                        state.push_flash(Notice::success(format!(
                            "Successfully approved {count} {}(s)!",
                            target.noun()
                        )));
                        state.push_flash(Notice::info(format!("{agent} will send outreach emails shortly.")));
                    })
                    .await?;
                self.sources.invalidate().await;
            }
            DispatchOutcome::Failed(failure) => {
                self.sessions
                    .with_session(session_id, |state| {
                        state.push_flash(Notice::error(format!("Failed to send to {agent}: {failure}")));
                        state.push_flash(Notice::info(format!(
                            "Check that the {agent} webhook is running in n8n"
                        )));
                    })
                    .await?;
            }
        }
        Ok(outcome)
    }

    pub async fn refresh(&self, session_id: &str) -> AppResult<()> {
        self.sources.invalidate().await;
        self.sessions
            .with_session(session_id, SessionState::reset_interaction)
            .await
    }

    pub async fn create_task(&self, session_id: &str, form: TaskForm) -> AppResult<DispatchOutcome<CreatedTask>> {
        let errors = form.validate();
        if !errors.is_empty() {
            let error = AppError::Validation(errors);
            self.flash_validation(session_id, &error).await?;
            return Err(error);
        }

        let title = form.title.trim().to_string();
        let local_id = generate_task_id(Local::now());
        let payload = form.into_payload(local_id.clone(), Utc::now());
        let outcome = match self.dispatcher.create_task(&payload).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.flash_validation(session_id, &error).await?;
                return Err(error);
            }
        };
        let outcome = outcome.map(|response| CreatedTask {
            task_id: assigned_task_id(&response, &local_id),
            response,
        });

        let notice = match &outcome {
            DispatchOutcome::Delivered(created) => {
                tracing::info!(task_id = %created.task_id, "task created");
                Notice::success(format!("Task '{title}' created successfully!"))
            }
            DispatchOutcome::Failed(_) => {
                Notice::error("Failed to create task. Check that the OPSI webhook is running in n8n.")
            }
        };
        self.sessions
            .with_session(session_id, |state| state.push_flash(notice))
            .await?;
        if outcome.is_success() {
            self.sources.invalidate().await;
        }
        Ok(outcome)
    }

    pub async fn open_task(&self, session_id: &str, task_id: &str) -> AppResult<TaskDraft> {
        let snapshot = self.sources.fetch(SourceKind::Tasks).await;
        let record = find_task(&snapshot, task_id)?;
        let today = Local::now().date_naive();
        self.sessions
            .with_session(session_id, |state| state.editor.open(record, today).cloned())
            .await?
    }

    pub async fn edit_task(&self, session_id: &str, edit: DraftEdit) -> AppResult<()> {
        self.sessions
            .with_session(session_id, |state| state.editor.apply(edit))
            .await?
    }

    pub async fn cancel_edit(&self, session_id: &str) -> AppResult<()> {
        self.sessions
            .with_session(session_id, |state| state.editor.cancel())
            .await
    }

    pub async fn submit_task_edit(&self, session_id: &str) -> AppResult<DispatchOutcome<serde_json::Value>> {
        let payload = self
            .sessions
            .with_session(session_id, |state| state.editor.submit())
            .await??;
        let task_id = payload.task_id.clone().unwrap_or_default();

        let outcome = match self.dispatcher.update_task(&payload).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.sessions
                    .with_session(session_id, |state| {
                        state.editor.resolve(false);
                        push_validation(state, &error);
                    })
                    .await?;
                return Err(error);
            }
        };

        let delivered = outcome.is_success();
        let notice = match outcome.failure() {
            None => Notice::success(format!("Task {task_id} updated successfully!")),
            Some(failure) => Notice::error(format!("Failed to update task: {failure}")),
        };
        self.sessions
            .with_session(session_id, |state| {
                state.editor.resolve(delivered);
                if delivered {
                    state.task_id_search.clear();
                }
                state.push_flash(notice);
            })
            .await?;
        if delivered {
            self.sources.invalidate().await;
        }
        Ok(outcome)
    }

    pub async fn export(&self, session_id: &str, kind: SourceKind) -> AppResult<CsvExport> {
        let snapshot = self.sources.fetch(kind).await;
        let query = self
            .sessions
            .with_session(session_id, |state| state.search(kind).to_string())
            .await?;
        let records = views::displayed_records(&snapshot, &query);
        let export = export_csv(kind, snapshot.headers(), &records, Local::now())?;
        tracing::info!(source = %kind, rows = records.len(), filename = %export.filename, "csv export built");
        Ok(export)
    }

    async fn notices(&self, session_id: &str, snapshots: &[&Snapshot]) -> AppResult<Vec<Notice>> {
        let mut notices = self.sessions.with_session(session_id, SessionState::take_flash).await?;
        for snapshot in snapshots {
            if let Some(message) = &snapshot.load_error {
                notices.push(Notice::warning(format!(
                    "Could not load {} data: {message}",
                    snapshot.kind.agent()
                )));
            }
        }
        Ok(notices)
    }

    async fn flash_validation(&self, session_id: &str, error: &AppError) -> AppResult<()> {
        self.sessions
            .with_session(session_id, |state| push_validation(state, error))
            .await
    }
}

fn push_validation(state: &mut SessionState, error: &AppError) {
    match error {
        AppError::Validation(messages) => {
            for message in messages {
                state.push_flash(Notice::warning(message.clone()));
            }
        }
        other => state.push_flash(Notice::error(other.to_string())),
    }
}

fn approval_target(kind: SourceKind) -> AppResult<ApprovalTarget> {
    kind.approval_target()
        .ok_or_else(|| AppError::validation(format!("{kind} has no approval workflow.")))
}

fn find_task<'a>(snapshot: &'a Snapshot, task_id: &str) -> AppResult<&'a Record> {
    let task_id = task_id.trim();
    snapshot
        .find(task_id)
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))
}
