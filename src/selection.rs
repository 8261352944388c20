use std::collections::BTreeSet;

/// The set never holds an id outside the universe of the last render.
/// While select-all is on, every sync re-selects the whole new universe;
/// unchecking any row, `select_all(false)` or `clear` turns it off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    universe: Vec<String>,
    selected: BTreeSet<String>,
    all: bool,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync_universe<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        self.universe = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        if self.all {
            self.selected = seen;
            return;
        }
        let before = self.selected.len();
        self.selected.retain(|id| seen.contains(id));
        let dropped = before - self.selected.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped stale selections");
        }
    }

    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        if !self.universe.iter().any(|candidate| candidate == id) {
            return None;
        }
        if self.selected.remove(id) {
            self.all = false;
            Some(false)
        } else {
            self.selected.insert(id.to_string());
            Some(true)
        }
    }

    pub fn set(&mut self, id: &str, selected: bool) -> bool {
        if self.is_selected(id) == selected {
            return self.universe.iter().any(|candidate| candidate == id);
        }
        self.toggle(id).is_some()
    }

    pub fn select_all(&mut self, all: bool) {
        self.all = all;
        self.selected = if all {
            self.universe.iter().cloned().collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn clear(&mut self) {
        self.all = false;
        self.selected.clear();
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn all_selected(&self) -> bool {
        !self.universe.is_empty() && self.selected.len() == self.universe.len()
    }

    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.universe
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }
}
