use crate::domain::{BelongingToView, Entry, FilterState, InsertType, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HideReason {
    SearchMismatch,
    HasCategory,
    NotViewSpecific,
    ViewSpecific,
    NotLinked,
    Linked,
}

impl HideReason {
    pub fn label(self) -> &'static str {
        match self {
            HideReason::SearchMismatch => "search",
            HideReason::HasCategory => "category",
            HideReason::NotViewSpecific => "not-view-specific",
            HideReason::ViewSpecific => "view-specific",
            HideReason::NotLinked => "not-linked",
            HideReason::Linked => "linked",
        }
    }
}

pub fn visibility_of(entry: &Entry, filter: &FilterState) -> Visibility {
    match hide_reason(entry, filter) {
        Some(_) => Visibility::Hidden,
        None => Visibility::Visible,
    }
}

/// First rule of the chain that hides `entry`. Later rules are never consulted
/// once one matches, so the order below is part of the contract.
pub fn hide_reason(entry: &Entry, filter: &FilterState) -> Option<HideReason> {
    let needle = fold(filter.search_text.trim());
    if !fold(&entry.name).contains(&needle) && !fold(&entry.owner_view_name).contains(&needle) {
        return Some(HideReason::SearchMismatch);
    }

    if filter.belonging_to_view == BelongingToView::Unidentified && entry.category.is_some() {
        return Some(HideReason::HasCategory);
    }

    if filter.belonging_to_view == BelongingToView::ViewSpecific && !entry.view_specific {
        return Some(HideReason::NotViewSpecific);
    }

    if filter.belonging_to_view == BelongingToView::ModelImports && entry.view_specific {
        return Some(HideReason::ViewSpecific);
    }

    if filter.insert_type == InsertType::Linked && !entry.is_linked {
        return Some(HideReason::NotLinked);
    }

    if filter.insert_type == InsertType::Imported && entry.is_linked {
        return Some(HideReason::Linked);
    }

    None
}

fn fold(text: &str) -> String {
    text.to_uppercase()
}
