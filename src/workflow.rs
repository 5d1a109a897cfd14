use crate::collection::ImportCollection;
use crate::domain::{Confirmation, DeleteTarget, ElementId, Entry, HostCommand, HostReport};
use crate::error::{DispatchError, WorkflowError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    AwaitingConfirmation {
        target: DeleteTarget,
        ids: Vec<ElementId>,
    },
    Dispatched {
        ids: Vec<ElementId>,
    },
    Reloading,
}

impl WorkflowState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::AwaitingConfirmation { .. } => "confirm",
            WorkflowState::Dispatched { .. } => "deleting",
            WorkflowState::Reloading => "reloading",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    Nothing,
    Prompt { count: usize },
    Dispatch(HostCommand),
    Reload,
    Completed { deleted: usize },
    Failed(WorkflowError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopmostFlag {
    preferred: bool,
    current: bool,
}

impl TopmostFlag {
    pub fn new(preferred: bool) -> Self {
        Self {
            preferred,
            current: preferred,
        }
    }

    pub fn is_on(self) -> bool {
        self.current
    }

    fn release(&mut self) {
        self.current = false;
    }

    fn restore(&mut self) {
        self.current = self.preferred;
    }
}

#[derive(Debug)]
pub struct DeleteWorkflow {
    state: WorkflowState,
    topmost: TopmostFlag,
    deleted: usize,
}

impl DeleteWorkflow {
    pub fn new(keep_on_top: bool) -> Self {
        Self {
            state: WorkflowState::Idle,
            topmost: TopmostFlag::new(keep_on_top),
            deleted: 0,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == WorkflowState::Idle
    }

    pub fn topmost(&self) -> TopmostFlag {
        self.topmost
    }

    pub fn begin(&mut self, target: DeleteTarget, ids: Vec<ElementId>) -> WorkflowStep {
        if !self.is_idle() {
            tracing::debug!(state = ?self.state, "delete request ignored while busy");
            return WorkflowStep::Nothing;
        }
        if ids.is_empty() {
            return WorkflowStep::Nothing;
        }

        let count = ids.len();
        self.topmost.release();
        self.state = WorkflowState::AwaitingConfirmation { target, ids };
        WorkflowStep::Prompt { count }
    }

    pub fn resolve_confirmation(&mut self, answer: Confirmation, document: &str) -> WorkflowStep {
        let (target, ids) = match &self.state {
            WorkflowState::AwaitingConfirmation { target, ids } => (*target, ids.clone()),
            _ => return WorkflowStep::Nothing,
        };

        if answer != Confirmation::Affirm {
            tracing::info!(?answer, "delete not confirmed");
            self.finish();
            return WorkflowStep::Nothing;
        }

        let command = target.build_command(document.to_string(), ids.clone());
        self.state = WorkflowState::Dispatched { ids };
        WorkflowStep::Dispatch(command)
    }

    pub fn command_finished(&mut self, outcome: Result<HostReport, DispatchError>) -> WorkflowStep {
        if !matches!(self.state, WorkflowState::Dispatched { .. }) {
            return WorkflowStep::Nothing;
        }

        match outcome {
            Ok(report) => {
                self.deleted = report.deleted.len();
                self.state = WorkflowState::Reloading;
                WorkflowStep::Reload
            }
            Err(err) => self.fail(err.into()),
        }
    }

    pub fn reload_finished(
        &mut self,
        snapshot: Result<Vec<Entry>, WorkflowError>,
        collection: &mut ImportCollection,
    ) -> WorkflowStep {
        if self.state != WorkflowState::Reloading {
            return WorkflowStep::Nothing;
        }

        match snapshot.and_then(|entries| collection.load(entries)) {
            Ok(()) => {
                let deleted = self.deleted;
                self.finish();
                WorkflowStep::Completed { deleted }
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn abort(&mut self, err: WorkflowError) -> WorkflowStep {
        self.fail(err)
    }

    fn fail(&mut self, err: WorkflowError) -> WorkflowStep {
        tracing::error!(error = %err, state = ?self.state, "bulk delete failed");
        self.finish();
        WorkflowStep::Failed(err)
    }

    fn finish(&mut self) {
        self.state = WorkflowState::Idle;
        self.deleted = 0;
        self.topmost.restore();
    }
}
