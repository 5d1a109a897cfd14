use crate::domain::{CommandKind, HostCommand, HostReport};
use crate::error::DispatchError;
use crate::infra::HostDocument;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

pub type Outcome = Result<HostReport, DispatchError>;

struct PendingCommand {
    command: HostCommand,
    done: oneshot::Sender<Outcome>,
}

#[derive(Clone, Default)]
struct SlotTable {
    inner: Arc<Mutex<HashMap<CommandKind, PendingCommand>>>,
}

impl SlotTable {
    fn put(&self, pending: PendingCommand) -> Option<PendingCommand> {
        let kind = pending.command.kind();
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, pending)
    }

    fn take(&self, kind: CommandKind) -> Option<PendingCommand> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind)
    }
}

/// Hands host mutations to the executor task, which is the only place that
/// calls [`HostDocument::execute`].
#[derive(Clone)]
pub struct Dispatcher {
    slots: SlotTable,
    signal_tx: UnboundedSender<CommandKind>,
}

impl Dispatcher {
    pub fn spawn(host: Arc<dyn HostDocument>) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel::<CommandKind>();
        let slots = SlotTable::default();
        tokio::spawn(executor_loop(host, slots.clone(), signal_rx));
        Self { slots, signal_tx }
    }

    pub fn submit(&self, command: HostCommand) -> Result<Completion, DispatchError> {
        let kind = command.kind();
        let (done, rx) = oneshot::channel();

        tracing::info!(kind = kind.label(), document = command.document(), "submitting host command");
        if let Some(previous) = self.slots.put(PendingCommand { command, done }) {
            tracing::warn!(kind = kind.label(), "replacing unconsumed host command");
            let _ = previous.done.send(Err(DispatchError::Superseded { kind }));
        }

        if self.signal_tx.send(kind).is_err() {
            self.slots.take(kind);
            tracing::error!(kind = kind.label(), "host executor is gone");
            return Err(DispatchError::Unavailable { kind });
        }

        Ok(Completion { kind, rx })
    }
}

#[derive(Debug)]
pub struct Completion {
    kind: CommandKind,
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub async fn wait(self) -> Outcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchError::Unavailable { kind: self.kind }),
        }
    }
}

async fn executor_loop(
    host: Arc<dyn HostDocument>,
    slots: SlotTable,
    mut signal_rx: UnboundedReceiver<CommandKind>,
) {
    while let Some(kind) = signal_rx.recv().await {
        // A superseded submission leaves an extra signal behind.
        let Some(pending) = slots.take(kind) else {
            continue;
        };

        let h = host.clone();
        let command = pending.command;
        let result = tokio::task::spawn_blocking(move || h.execute(&command)).await;
        let outcome = flatten_outcome(kind, result);
        match &outcome {
            Ok(report) => tracing::info!(
                kind = kind.label(),
                deleted = report.deleted.len(),
                "host command finished"
            ),
            Err(err) => tracing::warn!(kind = kind.label(), error = %err, "host command failed"),
        }

        if pending.done.send(outcome).is_err() {
            tracing::debug!(kind = kind.label(), "no one is waiting for host command result");
        }
    }
}

fn flatten_outcome(
    kind: CommandKind,
    res: std::result::Result<anyhow::Result<HostReport>, tokio::task::JoinError>,
) -> Outcome {
    match res {
        Ok(Ok(report)) if report.failed.is_empty() => Ok(report),
        Ok(Ok(report)) => {
            let failed = report
                .failed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            Err(DispatchError::HostExecution {
                kind,
                message: format!(
                    "partially failed: deleted={} failed=[{failed}]",
                    report.deleted.len()
                ),
            })
        }
        Ok(Err(err)) => Err(DispatchError::HostExecution {
            kind,
            message: format!("{err:#}"),
        }),
        Err(err) => Err(DispatchError::HostExecution {
            kind,
            message: format!("join error: {err}"),
        }),
    }
}
