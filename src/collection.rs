use crate::domain::{BelongingToView, ElementId, Entry, FilterState, InsertType, Visibility};
use crate::error::WorkflowError;
use crate::filter::{hide_reason, visibility_of};
use crate::selection::SelectionTracker;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
pub struct ImportCollection {
    entries: Vec<Entry>,
    filter: FilterState,
    tracker: SelectionTracker,
}

impl ImportCollection {
    /// Replaces the collection wholesale. On a duplicate id the current
    /// entries are kept and an enumeration failure is returned.
    pub fn load(&mut self, entries: Vec<Entry>) -> Result<(), WorkflowError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(WorkflowError::duplicate_id(entry.id));
            }
        }

        self.entries = entries;
        self.apply_filter();
        tracing::info!(
            total = self.entries.len(),
            visible = self.visible_len(),
            "collection loaded"
        );
        Ok(())
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_filter_state(&mut self, filter: FilterState) {
        self.filter = filter;
        self.apply_filter();
    }

    pub fn set_belonging_to_view(&mut self, value: BelongingToView) -> bool {
        if self.filter.belonging_to_view == value {
            return false;
        }
        self.filter.belonging_to_view = value;
        self.apply_filter();
        true
    }

    pub fn set_insert_type(&mut self, value: InsertType) -> bool {
        if self.filter.insert_type == value {
            return false;
        }
        self.filter.insert_type = value;
        self.apply_filter();
        true
    }

    pub fn set_search_text(&mut self, value: String) -> bool {
        if self.filter.search_text == value {
            return false;
        }
        self.filter.search_text = value;
        self.apply_filter();
        true
    }

    pub fn select_all_visible(&mut self) -> usize {
        for entry in self.entries.iter_mut().filter(|entry| entry.visible()) {
            entry.selected = true;
        }
        self.tracker.recompute(&self.entries)
    }

    pub fn clear_selection(&mut self) -> bool {
        let mut changed = false;
        for entry in self.entries.iter_mut().filter(|entry| entry.selected) {
            entry.selected = false;
            changed = true;
        }
        self.tracker.recompute(&self.entries);
        changed
    }

    pub fn toggle_selected(&mut self, index: usize) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        let next = !entry.selected;
        self.set_selected(index, next)
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        entry.selected = selected;
        self.tracker.recompute(&self.entries);
        true
    }

    pub fn current_visible_selected_ids(&self) -> Vec<ElementId> {
        self.entries
            .iter()
            .filter(|entry| entry.selected && entry.visible())
            .map(|entry| entry.id)
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.tracker.count()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.visible())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn visible_len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.visible()).count()
    }

    fn apply_filter(&mut self) {
        for entry in &mut self.entries {
            let visibility = visibility_of(entry, &self.filter);
            entry.set_visible(visibility == Visibility::Visible);
        }
        self.tracker.recompute(&self.entries);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let hidden = self.hidden_by_reason();
            tracing::debug!(
                belonging = self.filter.belonging_to_view.label(),
                insert = self.filter.insert_type.label(),
                search = %self.filter.search_text,
                selected = self.tracker.count(),
                ?hidden,
                "filter pass"
            );
        }
    }

    fn hidden_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut hidden = BTreeMap::new();
        for reason in self
            .entries
            .iter()
            .filter_map(|entry| hide_reason(entry, &self.filter))
        {
            *hidden.entry(reason.label()).or_default() += 1;
        }
        hidden
    }
}
