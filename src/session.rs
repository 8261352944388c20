use crate::editor::TaskEditor;
use crate::errors::{AppError, AppResult};
use crate::models::{Notice, SourceKind};
use crate::selection::SelectionSet;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    selections: HashMap<SourceKind, SelectionSet>,
    searches: HashMap<SourceKind, String>,
    pub task_id_search: String,
    pub editor: TaskEditor,
    flash: Vec<Notice>,
    approved_ids: HashMap<SourceKind, Vec<String>>,
}

impl SessionState {
    pub fn selection(&self, kind: SourceKind) -> Option<&SelectionSet> {
        self.selections.get(&kind)
    }

    pub fn selection_mut(&mut self, kind: SourceKind) -> &mut SelectionSet {
        self.selections.entry(kind).or_default()
    }

    pub fn search(&self, kind: SourceKind) -> &str {
        self.searches.get(&kind).map(String::as_str).unwrap_or("")
    }

    pub fn set_search(&mut self, kind: SourceKind, query: impl Into<String>) {
        self.searches.insert(kind, query.into());
    }

    pub fn push_flash(&mut self, notice: Notice) {
        self.flash.push(notice);
    }

    pub fn take_flash(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.flash)
    }

    pub fn set_approved_ids(&mut self, kind: SourceKind, ids: Vec<String>) {
        self.approved_ids.insert(kind, ids);
    }

    pub fn take_approved_ids(&mut self, kind: SourceKind) -> Vec<String> {
        self.approved_ids.remove(&kind).unwrap_or_default()
    }

    pub fn reset_interaction(&mut self) {
        for selection in self.selections.values_mut() {
            selection.clear();
        }
        self.task_id_search.clear();
        self.editor.cancel();
    }
}

#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, SessionState>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_id.clone(), SessionState::default());
        session_id
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    pub async fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> AppResult<R> {
        let mut sessions = self.sessions.lock().await;
        let Some(state) = sessions.get_mut(session_id) else {
            return Err(AppError::NotFound(format!("No active session {}", session_id)));
        };
        Ok(f(state))
    }

    pub async fn close_session(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id);
    }
}
