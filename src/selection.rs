use crate::domain::Entry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    count: usize,
}

impl SelectionTracker {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn recompute(&mut self, entries: &[Entry]) -> usize {
        self.count = entries
            .iter()
            .filter(|entry| entry.selected && entry.visible())
            .count();
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ElementId;

    #[test]
    fn hidden_selected_entries_are_not_counted() {
        let mut shown = Entry::new(ElementId(1), "a");
        shown.selected = true;
        let mut hidden = Entry::new(ElementId(2), "b");
        hidden.selected = true;
        hidden.set_visible(false);
        let idle = Entry::new(ElementId(3), "c");

        let mut tracker = SelectionTracker::default();
        assert_eq!(tracker.recompute(&[shown, hidden, idle]), 1);
        assert_eq!(tracker.count(), 1);

        assert_eq!(tracker.recompute(&[]), 0);
    }
}
