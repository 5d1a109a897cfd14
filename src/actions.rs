use crate::app::{App, BackendTask, NoticeLevel, ReloadReason};
use crate::backend::BackendHandle;
use crate::domain::{DeleteTarget, HostCommand};
use crate::error::WorkflowError;
use crate::workflow::WorkflowStep;
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) fn send_task(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    task: BackendTask,
) -> Result<()> {
    task_tx
        .send(task)
        .map_err(|err| anyhow::anyhow!("failed to dispatch task: {err}"))?;
    app.request_started();
    Ok(())
}

pub(crate) fn request_delete(
    app: &mut App,
    backend: &BackendHandle,
    target: DeleteTarget,
) -> Result<()> {
    let ids = match target {
        DeleteTarget::Selection => app.collection.current_visible_selected_ids(),
        DeleteTarget::Focused => app.focused_id().into_iter().collect(),
    };
    if ids.is_empty() {
        app.log(format!("delete {}: nothing to delete", target.label()));
        return Ok(());
    }

    let step = app.workflow.begin(target, ids);
    drive_workflow(app, backend, step)
}

pub(crate) fn drive_workflow(
    app: &mut App,
    backend: &BackendHandle,
    step: WorkflowStep,
) -> Result<()> {
    let mut next = Some(step);
    while let Some(step) = next.take() {
        match step {
            WorkflowStep::Nothing => {}
            WorkflowStep::Prompt { count } => app.open_confirm(count),
            WorkflowStep::Dispatch(command) => {
                app.log(format!(
                    "dispatch {} ({})",
                    command.kind().label(),
                    command_size(&command)
                ));
                match backend.submit(command) {
                    Ok(()) => app.request_started(),
                    Err(err) => next = Some(app.workflow.abort(err.into())),
                }
            }
            WorkflowStep::Reload => {
                let task = BackendTask::Reload {
                    reason: ReloadReason::AfterDelete,
                };
                if let Err(err) = send_task(app, &backend.task_tx, task) {
                    let err = WorkflowError::EnumerationFailure(format!("{err:#}"));
                    next = Some(app.workflow.abort(err));
                }
            }
            WorkflowStep::Completed { deleted } => {
                let focused = app.focused_id();
                app.refocus(focused);
                app.notify(NoticeLevel::Info, format!("deleted {deleted} element(s)"));
            }
            WorkflowStep::Failed(err) => app.notify(NoticeLevel::Error, err.to_string()),
        }
    }
    Ok(())
}

pub(crate) fn go_to_owner_view(app: &mut App, backend: &BackendHandle) {
    let Some(entry) = app.focused_entry() else {
        return;
    };
    let Some(view) = entry.owner_view_id else {
        let name = entry.name.clone();
        app.log(format!("{name} is not placed in a view"));
        return;
    };

    let command = HostCommand::ChangeActiveView {
        document: app.document().to_string(),
        view,
    };
    match backend.submit(command) {
        Ok(()) => app.request_started(),
        Err(err) => app.notify(NoticeLevel::Error, err.to_string()),
    }
}

pub(crate) fn request_reload(app: &mut App, backend: &BackendHandle) -> Result<()> {
    app.log("reloading host snapshot".to_string());
    send_task(
        app,
        &backend.task_tx,
        BackendTask::Reload {
            reason: ReloadReason::Manual,
        },
    )
}

fn command_size(command: &HostCommand) -> String {
    match command {
        HostCommand::DeleteMany { ids, .. } => format!("{} element(s)", ids.len()),
        HostCommand::DeleteOne { id, .. } => id.to_string(),
        HostCommand::ChangeActiveView { view, .. } => format!("view {view}"),
    }
}
