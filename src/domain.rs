use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: ElementId,
    pub name: String,
    pub owner_view_name: String,
    pub owner_view_id: Option<ElementId>,
    pub category: Option<String>,
    pub view_specific: bool,
    pub is_linked: bool,
    pub selected: bool,
    visible: bool,
}

impl Entry {
    pub fn new(id: ElementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner_view_name: String::new(),
            owner_view_id: None,
            category: None,
            view_specific: false,
            is_linked: false,
            selected: false,
            visible: true,
        }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn insert_label(&self) -> &'static str {
        if self.is_linked { "link" } else { "import" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BelongingToView {
    #[default]
    All,
    Unidentified,
    ViewSpecific,
    ModelImports,
}

impl BelongingToView {
    pub const ALL: [BelongingToView; 4] = [
        BelongingToView::All,
        BelongingToView::Unidentified,
        BelongingToView::ViewSpecific,
        BelongingToView::ModelImports,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BelongingToView::All => "all",
            BelongingToView::Unidentified => "unidentified",
            BelongingToView::ViewSpecific => "view-specific",
            BelongingToView::ModelImports => "model",
        }
    }

    pub fn next(self) -> Self {
        match self {
            BelongingToView::All => BelongingToView::Unidentified,
            BelongingToView::Unidentified => BelongingToView::ViewSpecific,
            BelongingToView::ViewSpecific => BelongingToView::ModelImports,
            BelongingToView::ModelImports => BelongingToView::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertType {
    #[default]
    All,
    Imported,
    Linked,
}

impl InsertType {
    pub const ALL: [InsertType; 3] = [InsertType::All, InsertType::Imported, InsertType::Linked];

    pub fn label(self) -> &'static str {
        match self {
            InsertType::All => "all",
            InsertType::Imported => "imported",
            InsertType::Linked => "linked",
        }
    }

    pub fn next(self) -> Self {
        match self {
            InsertType::All => InsertType::Imported,
            InsertType::Imported => InsertType::Linked,
            InsertType::Linked => InsertType::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub belonging_to_view: BelongingToView,
    pub insert_type: InsertType,
    pub search_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    DeleteMany,
    DeleteOne,
    ChangeActiveView,
}

impl CommandKind {
    pub fn label(self) -> &'static str {
        match self {
            CommandKind::DeleteMany => "delete-many",
            CommandKind::DeleteOne => "delete-one",
            CommandKind::ChangeActiveView => "change-view",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    DeleteMany {
        document: String,
        ids: Vec<ElementId>,
    },
    DeleteOne {
        document: String,
        id: ElementId,
    },
    ChangeActiveView {
        document: String,
        view: ElementId,
    },
}

impl HostCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            HostCommand::DeleteMany { .. } => CommandKind::DeleteMany,
            HostCommand::DeleteOne { .. } => CommandKind::DeleteOne,
            HostCommand::ChangeActiveView { .. } => CommandKind::ChangeActiveView,
        }
    }

    pub fn document(&self) -> &str {
        match self {
            HostCommand::DeleteMany { document, .. }
            | HostCommand::DeleteOne { document, .. }
            | HostCommand::ChangeActiveView { document, .. } => document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostReport {
    pub deleted: Vec<ElementId>,
    pub failed: Vec<ElementId>,
    pub active_view: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Affirm,
    Decline,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Selection,
    Focused,
}

impl DeleteTarget {
    pub fn label(self) -> &'static str {
        match self {
            DeleteTarget::Selection => "selection",
            DeleteTarget::Focused => "focused",
        }
    }

    pub fn build_command(self, document: String, ids: Vec<ElementId>) -> HostCommand {
        match (self, ids.as_slice()) {
            (DeleteTarget::Focused, [id]) => HostCommand::DeleteOne { document, id: *id },
            _ => HostCommand::DeleteMany { document, ids },
        }
    }
}
