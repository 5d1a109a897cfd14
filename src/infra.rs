use crate::domain::{ElementId, Entry, HostCommand, HostReport};
use crate::error::WorkflowError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub trait HostDocument: Send + Sync {
    fn context(&self) -> HostContext;
    fn elements(&self) -> Result<Vec<RawElement>>;
    fn execute(&self, command: &HostCommand) -> Result<HostReport>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
    pub document: String,
    pub active_view: Option<String>,
    pub views: BTreeMap<ElementId, String>,
}

impl HostContext {
    pub fn view_name(&self, id: ElementId) -> Option<&str> {
        self.views.get(&id).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub id: Option<ElementId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner_view: Option<ElementId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub linked: bool,
    #[serde(default)]
    pub host: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub id: ElementId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotDocument {
    pub title: String,
    pub active_view: Option<ElementId>,
    pub views: Vec<ViewRecord>,
    pub elements: Vec<RawElement>,
}

pub fn parse_document(raw: &str) -> Result<SnapshotDocument> {
    serde_json::from_str::<SnapshotDocument>(raw).context("invalid host document JSON")
}

#[derive(Debug)]
pub struct SnapshotHost {
    document: Mutex<SnapshotDocument>,
}

impl SnapshotHost {
    pub fn new(document: SnapshotDocument) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read host document: {}", path.display()))?;
        let mut document = parse_document(&raw)
            .with_context(|| format!("failed to parse host document: {}", path.display()))?;
        if document.title.is_empty() {
            document.title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "untitled".to_string());
        }
        Ok(Self::new(document))
    }

    fn with_document<T>(&self, f: impl FnOnce(&mut SnapshotDocument) -> T) -> T {
        let mut guard = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl HostDocument for SnapshotHost {
    fn context(&self) -> HostContext {
        self.with_document(|doc| {
            let views: BTreeMap<ElementId, String> = doc
                .views
                .iter()
                .map(|view| (view.id, view.name.clone()))
                .collect();
            HostContext {
                document: doc.title.clone(),
                active_view: doc.active_view.and_then(|id| views.get(&id).cloned()),
                views,
            }
        })
    }

    fn elements(&self) -> Result<Vec<RawElement>> {
        Ok(self.with_document(|doc| doc.elements.clone()))
    }

    fn execute(&self, command: &HostCommand) -> Result<HostReport> {
        self.with_document(|doc| {
            if command.document() != doc.title {
                bail!(
                    "command targets document {:?} but {:?} is open",
                    command.document(),
                    doc.title
                );
            }

            match command {
                HostCommand::DeleteMany { ids, .. } => Ok(delete_elements(doc, ids)),
                HostCommand::DeleteOne { id, .. } => Ok(delete_elements(doc, &[*id])),
                HostCommand::ChangeActiveView { view, .. } => {
                    let name = doc
                        .views
                        .iter()
                        .find(|record| record.id == *view)
                        .map(|record| record.name.clone())
                        .with_context(|| format!("view {view} does not exist"))?;
                    doc.active_view = Some(*view);
                    Ok(HostReport {
                        active_view: Some(name),
                        ..HostReport::default()
                    })
                }
            }
        })
    }
}

/// Removes `ids` and every element hosted (directly or transitively) by a
/// removed element. Ids not present in the document are reported as failed.
fn delete_elements(doc: &mut SnapshotDocument, ids: &[ElementId]) -> HostReport {
    let present: HashSet<ElementId> = doc.elements.iter().filter_map(|e| e.id).collect();
    let mut report = HostReport::default();
    let mut removed: HashSet<ElementId> = HashSet::new();

    for id in ids {
        if present.contains(id) && removed.insert(*id) {
            report.deleted.push(*id);
        } else if !present.contains(id) {
            report.failed.push(*id);
        }
    }

    loop {
        let cascaded: Vec<ElementId> = doc
            .elements
            .iter()
            .filter_map(|e| match (e.id, e.host) {
                (Some(id), Some(host)) if removed.contains(&host) && !removed.contains(&id) => {
                    Some(id)
                }
                _ => None,
            })
            .collect();
        if cascaded.is_empty() {
            break;
        }
        for id in cascaded {
            removed.insert(id);
            report.deleted.push(id);
        }
    }

    doc.elements
        .retain(|e| e.id.is_none_or(|id| !removed.contains(&id)));
    report
}

pub fn build_entry(raw: &RawElement, ctx: &HostContext) -> Result<Entry, WorkflowError> {
    let id = raw.id.ok_or_else(|| WorkflowError::missing_id(&raw.name))?;
    let mut entry = Entry::new(id, raw.name.clone());
    entry.owner_view_id = raw.owner_view;
    entry.owner_view_name = raw
        .owner_view
        .and_then(|view| ctx.view_name(view))
        .unwrap_or_default()
        .to_string();
    entry.category = raw.category.clone().filter(|c| !c.trim().is_empty());
    entry.view_specific = raw.owner_view.is_some();
    entry.is_linked = raw.linked;
    Ok(entry)
}

pub fn snapshot_entries(host: &dyn HostDocument) -> Result<Vec<Entry>, WorkflowError> {
    let raw = host
        .elements()
        .map_err(|err| WorkflowError::EnumerationFailure(format!("{err:#}")))?;
    let ctx = host.context();
    raw.iter().map(|element| build_entry(element, &ctx)).collect()
}
