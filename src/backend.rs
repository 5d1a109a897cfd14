use crate::app::{BackendEvent, BackendTask};
use crate::dispatcher::{Completion, Dispatcher};
use crate::domain::HostCommand;
use crate::error::{DispatchError, WorkflowError};
use crate::infra::{HostDocument, snapshot_entries};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

#[derive(Clone)]
pub(crate) struct BackendHandle {
    pub task_tx: UnboundedSender<BackendTask>,
    pub event_tx: UnboundedSender<BackendEvent>,
    pub dispatcher: Dispatcher,
}

impl BackendHandle {
    pub fn submit(&self, command: HostCommand) -> Result<(), DispatchError> {
        let completion = self.dispatcher.submit(command)?;
        tokio::spawn(forward_completion(completion, self.event_tx.clone()));
        Ok(())
    }
}

async fn forward_completion(completion: Completion, event_tx: UnboundedSender<BackendEvent>) {
    let kind = completion.kind();
    let outcome = completion.wait().await;
    if event_tx
        .send(BackendEvent::CommandFinished { kind, outcome })
        .is_err()
    {
        tracing::debug!(kind = kind.label(), "ui is gone, dropping command result");
    }
}

pub(crate) async fn worker_loop(
    host: Arc<dyn HostDocument>,
    mut task_rx: UnboundedReceiver<BackendTask>,
    event_tx: UnboundedSender<BackendEvent>,
) {
    while let Some(task) = task_rx.recv().await {
        match task {
            BackendTask::Reload { reason } => {
                let h = host.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let snapshot = snapshot_entries(h.as_ref());
                    (h.context(), snapshot)
                })
                .await;

                let (context, snapshot) = match result {
                    Ok(pair) => pair,
                    Err(err) => (host.context(), Err(flatten_join_error(err))),
                };
                tracing::info!(
                    ?reason,
                    ok = snapshot.is_ok(),
                    entries = snapshot.as_ref().map(Vec::len).unwrap_or_default(),
                    "snapshot taken"
                );

                if event_tx
                    .send(BackendEvent::Reloaded {
                        reason,
                        context,
                        snapshot,
                    })
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

fn flatten_join_error(err: tokio::task::JoinError) -> WorkflowError {
    WorkflowError::EnumerationFailure(format!("join error: {err}"))
}
