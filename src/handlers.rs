use crate::actions::{drive_workflow, go_to_owner_view, request_delete, request_reload};
use crate::app::{
    App, BackendEvent, ConfirmChoice, ModalState, NoticeLevel, PaneFocus, ReloadReason,
};
use crate::backend::BackendHandle;
use crate::domain::{CommandKind, Confirmation, DeleteTarget};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub(crate) fn handle_backend_event(
    app: &mut App,
    backend: &BackendHandle,
    event: BackendEvent,
) -> Result<()> {
    match event {
        BackendEvent::Reloaded {
            reason,
            context,
            snapshot,
        } => {
            app.request_settled();
            app.host = context;
            match reason {
                ReloadReason::AfterDelete => {
                    let step = app.workflow.reload_finished(snapshot, &mut app.collection);
                    drive_workflow(app, backend, step)?;
                }
                ReloadReason::Startup | ReloadReason::Manual => match app.apply_snapshot(snapshot) {
                    Ok(()) => app.log(format!(
                        "loaded {} import(s) from {}",
                        app.collection.len(),
                        app.host.document
                    )),
                    Err(err) => app.notify(NoticeLevel::Error, err.to_string()),
                },
            }
            app.sync_selection_bounds();
        }
        BackendEvent::CommandFinished { kind, outcome } => {
            app.request_settled();
            match kind {
                CommandKind::DeleteMany | CommandKind::DeleteOne => {
                    let step = app.workflow.command_finished(outcome);
                    drive_workflow(app, backend, step)?;
                }
                CommandKind::ChangeActiveView => match outcome {
                    Ok(report) => {
                        if let Some(view) = report.active_view {
                            app.log(format!("active view: {view}"));
                            app.host.active_view = Some(view);
                        }
                    }
                    Err(err) => app.notify(NoticeLevel::Error, err.to_string()),
                },
            }
        }
    }

    Ok(())
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    backend: &BackendHandle,
) -> Result<()> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    app.notice = None;
    match app.modal.clone() {
        ModalState::None => handle_key_without_modal(app, key, backend),
        ModalState::Search { .. } => {
            handle_search_key(app, key);
            Ok(())
        }
        ModalState::Confirm { .. } => handle_confirm_key(app, key, backend),
    }
}

fn handle_key_without_modal(
    app: &mut App,
    key: KeyEvent,
    backend: &BackendHandle,
) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            PaneFocus::List => app.select_next(),
            PaneFocus::Log => {
                app.scroll_log_down(1);
            }
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            PaneFocus::List => app.select_prev(),
            PaneFocus::Log => {
                app.scroll_log_up(1);
            }
        },
        code if !app.accepts_edits() && is_edit_key(app, code) => {
            app.log("delete in progress, input ignored".to_string());
        }
        KeyCode::Char(' ') => {
            app.toggle_focused_selection();
        }
        KeyCode::Char('A') => {
            let count = app.collection.select_all_visible();
            app.log(format!("selected {count} visible import(s)"));
        }
        KeyCode::Char('c') if key.modifiers.is_empty() => {
            if app.collection.clear_selection() {
                app.log("cleared selection".to_string());
            }
        }
        KeyCode::Char('D') => request_delete(app, backend, DeleteTarget::Selection)?,
        KeyCode::Char('x') => request_delete(app, backend, DeleteTarget::Focused)?,
        KeyCode::Char('g') => go_to_owner_view(app, backend),
        KeyCode::Char('v') => {
            let value = app.cycle_belonging_to_view();
            app.log(format!("belonging to view: {}", value.label()));
        }
        KeyCode::Char('t') => {
            let value = app.cycle_insert_type();
            app.log(format!("insert type: {}", value.label()));
        }
        KeyCode::Char('/') => app.open_search(),
        KeyCode::Esc if !app.search_text().is_empty() => {
            app.apply_search_immediately(String::new());
        }
        KeyCode::Char('r') if !app.is_busy() => request_reload(app, backend)?,
        _ => {}
    }

    Ok(())
}

fn is_edit_key(app: &App, code: KeyCode) -> bool {
    match code {
        KeyCode::Char(' ' | 'A' | 'c' | 'D' | 'x' | 'g' | 'v' | 't' | '/' | 'r') => true,
        KeyCode::Esc => !app.search_text().is_empty(),
        _ => false,
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    let mut immediate: Option<String> = None;
    let mut restore: Option<String> = None;
    let mut finalize = false;

    {
        let ModalState::Search { value, original } = &mut app.modal else {
            return;
        };

        match key.code {
            KeyCode::Esc => {
                restore = Some(original.clone());
                finalize = true;
            }
            KeyCode::Enter => finalize = true,
            KeyCode::Backspace => {
                value.pop();
                immediate = Some(value.clone());
            }
            KeyCode::Char(c)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT)
                    && !key.modifiers.contains(KeyModifiers::SUPER) =>
            {
                value.push(c);
                immediate = Some(value.clone());
            }
            _ => {}
        }
    }

    if let Some(text) = immediate {
        app.apply_search_immediately(text);
    }
    if let Some(text) = restore {
        app.apply_search_immediately(text);
    }
    if finalize {
        app.close_modal();
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent, backend: &BackendHandle) -> Result<()> {
    let ModalState::Confirm { choice, .. } = &mut app.modal else {
        return Ok(());
    };

    let answer = match key.code {
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h' | 'l') => {
            *choice = choice.toggle();
            return Ok(());
        }
        KeyCode::Char('y') => Confirmation::Affirm,
        KeyCode::Char('n') => Confirmation::Decline,
        KeyCode::Enter if *choice == ConfirmChoice::Yes => Confirmation::Affirm,
        KeyCode::Enter => Confirmation::Decline,
        KeyCode::Esc => Confirmation::Dismissed,
        _ => return Ok(()),
    };

    app.close_modal();
    let document = app.document().to_string();
    let step = app.workflow.resolve_confirmation(answer, &document);
    if answer != Confirmation::Affirm {
        app.log("delete cancelled".to_string());
    }
    drive_workflow(app, backend, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::BackendTask;
    use crate::config::AppConfig;
    use crate::dispatcher::Dispatcher;
    use crate::domain::{ElementId, Entry, HostCommand, HostReport};
    use crate::error::WorkflowError;
    use crate::infra::{HostContext, HostDocument, RawElement};
    use crate::workflow::WorkflowState;
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    #[derive(Default)]
    struct ScriptedHost {
        executed: Mutex<Vec<HostCommand>>,
        refuse: bool,
    }

    impl HostDocument for ScriptedHost {
        fn context(&self) -> HostContext {
            HostContext {
                document: "site".to_string(),
                ..HostContext::default()
            }
        }

        fn elements(&self) -> anyhow::Result<Vec<RawElement>> {
            Ok(Vec::new())
        }

        fn execute(&self, command: &HostCommand) -> anyhow::Result<HostReport> {
            self.executed.lock().expect("lock").push(command.clone());
            if self.refuse {
                bail!("element is pinned");
            }
            Ok(HostReport {
                deleted: match command {
                    HostCommand::DeleteMany { ids, .. } => ids.clone(),
                    HostCommand::DeleteOne { id, .. } => vec![*id],
                    HostCommand::ChangeActiveView { .. } => Vec::new(),
                },
                ..HostReport::default()
            })
        }
    }

    struct Harness {
        app: App,
        backend: BackendHandle,
        task_rx: UnboundedReceiver<BackendTask>,
        event_rx: UnboundedReceiver<BackendEvent>,
    }

    fn harness(host: Arc<ScriptedHost>) -> Harness {
        let mut app = App::new(&AppConfig::default());
        app.host = host.context();
        app.apply_snapshot(Ok(vec![
            Entry::new(ElementId(1), "Plan A"),
            Entry::new(ElementId(2), "Plan B"),
            Entry::new(ElementId(3), "Survey"),
        ]))
        .expect("load");

        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Harness {
            app,
            backend: BackendHandle {
                task_tx,
                event_tx,
                dispatcher: Dispatcher::spawn(host),
            },
            task_rx,
            event_rx,
        }
    }

    fn press(h: &mut Harness, code: KeyCode) {
        handle_key_event(&mut h.app, KeyEvent::new(code, KeyModifiers::NONE), &h.backend)
            .expect("handle key");
    }

    async fn pump_event(h: &mut Harness) {
        let event = h.event_rx.recv().await.expect("backend event");
        handle_backend_event(&mut h.app, &h.backend, event).expect("handle event");
    }

    #[tokio::test]
    async fn delete_with_empty_selection_opens_no_prompt() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());

        press(&mut h, KeyCode::Char('D'));

        assert_eq!(h.app.modal, ModalState::None);
        assert!(h.app.workflow.is_idle());
        assert!(host.executed.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn confirmed_delete_runs_one_command_and_reloads() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());

        press(&mut h, KeyCode::Char('A'));
        press(&mut h, KeyCode::Char('D'));
        assert_eq!(
            h.app.modal,
            ModalState::Confirm {
                count: 3,
                choice: ConfirmChoice::No
            }
        );
        assert!(!h.app.workflow.topmost().is_on());

        press(&mut h, KeyCode::Char('y'));
        assert_eq!(h.app.modal, ModalState::None);
        pump_event(&mut h).await;

        assert_eq!(h.app.workflow.state(), &WorkflowState::Reloading);
        let task = h.task_rx.recv().await.expect("reload task");
        assert!(matches!(
            task,
            BackendTask::Reload {
                reason: ReloadReason::AfterDelete
            }
        ));
        assert_eq!(
            host.executed.lock().expect("lock").clone(),
            vec![HostCommand::DeleteMany {
                document: "site".to_string(),
                ids: vec![ElementId(1), ElementId(2), ElementId(3)],
            }]
        );

        handle_backend_event(
            &mut h.app,
            &h.backend,
            BackendEvent::Reloaded {
                reason: ReloadReason::AfterDelete,
                context: host.context(),
                snapshot: Ok(Vec::new()),
            },
        )
        .expect("reload");

        assert!(h.app.workflow.is_idle());
        assert!(h.app.workflow.topmost().is_on());
        assert_eq!(h.app.collection.len(), 0);
        assert_eq!(h.app.collection.selected_count(), 0);
        assert!(h.app.notice.as_ref().is_some_and(|n| n.level == NoticeLevel::Info));
    }

    #[tokio::test]
    async fn host_failure_is_surfaced_once_and_keeps_collection() {
        let host = Arc::new(ScriptedHost {
            refuse: true,
            ..ScriptedHost::default()
        });
        let mut h = harness(host);

        press(&mut h, KeyCode::Char('A'));
        press(&mut h, KeyCode::Char('D'));
        press(&mut h, KeyCode::Char('y'));
        pump_event(&mut h).await;

        assert!(h.app.workflow.is_idle());
        assert!(h.app.workflow.topmost().is_on());
        assert!(h.task_rx.try_recv().is_err());
        assert_eq!(h.app.collection.len(), 3);
        assert_eq!(h.app.collection.selected_count(), 3);
        let errors = h.app.logs.iter().filter(|l| l.starts_with("error:")).count();
        assert_eq!(errors, 1);
        assert!(h.app.notice.as_ref().is_some_and(|n| n.text.contains("pinned")));
    }

    #[tokio::test]
    async fn esc_on_confirm_dismisses_without_command() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());

        press(&mut h, KeyCode::Char('x'));
        assert!(matches!(h.app.modal, ModalState::Confirm { count: 1, .. }));
        press(&mut h, KeyCode::Esc);

        assert_eq!(h.app.modal, ModalState::None);
        assert!(h.app.workflow.is_idle());
        assert!(h.app.workflow.topmost().is_on());
        assert!(host.executed.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn enter_follows_highlighted_choice() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());

        press(&mut h, KeyCode::Char('x'));
        press(&mut h, KeyCode::Enter);
        assert!(h.app.workflow.is_idle());

        press(&mut h, KeyCode::Char('x'));
        press(&mut h, KeyCode::Right);
        press(&mut h, KeyCode::Enter);
        pump_event(&mut h).await;
        assert_eq!(
            host.executed.lock().expect("lock").clone(),
            vec![HostCommand::DeleteOne {
                document: "site".to_string(),
                id: ElementId(1),
            }]
        );
    }

    #[tokio::test]
    async fn edits_are_refused_while_delete_is_pending() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host);

        press(&mut h, KeyCode::Char(' '));
        press(&mut h, KeyCode::Char('D'));
        press(&mut h, KeyCode::Char('y'));
        assert!(matches!(h.app.workflow.state(), WorkflowState::Dispatched { .. }));

        press(&mut h, KeyCode::Char('t'));
        press(&mut h, KeyCode::Char('c'));
        assert_eq!(h.app.collection.filter().insert_type, crate::domain::InsertType::All);
        assert_eq!(h.app.collection.selected_count(), 1);
    }

    #[tokio::test]
    async fn lost_enumeration_worker_still_ends_delete_in_idle() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host);
        h.task_rx.close();

        press(&mut h, KeyCode::Char('A'));
        press(&mut h, KeyCode::Char('D'));
        press(&mut h, KeyCode::Char('y'));
        pump_event(&mut h).await;

        assert!(h.app.workflow.is_idle());
        assert!(h.app.workflow.topmost().is_on());
        assert_eq!(h.app.collection.len(), 3);
        assert!(h.app.notice.as_ref().is_some_and(|n| {
            n.level == NoticeLevel::Error && n.text.starts_with("enumeration failure")
        }));
        assert!(!h.app.is_busy());
    }

    #[tokio::test]
    async fn unrelated_result_keeps_busy_while_delete_is_dispatched() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host);
        let mut entry = Entry::new(ElementId(7), "detail.dwg");
        entry.owner_view_id = Some(ElementId(11));
        entry.owner_view_name = "Site Plan".to_string();
        h.app.apply_snapshot(Ok(vec![entry])).expect("load");

        press(&mut h, KeyCode::Char('g'));
        press(&mut h, KeyCode::Char(' '));
        press(&mut h, KeyCode::Char('D'));
        press(&mut h, KeyCode::Char('y'));
        assert!(matches!(h.app.workflow.state(), WorkflowState::Dispatched { .. }));

        handle_backend_event(
            &mut h.app,
            &h.backend,
            BackendEvent::CommandFinished {
                kind: CommandKind::ChangeActiveView,
                outcome: Ok(HostReport::default()),
            },
        )
        .expect("event");

        assert!(h.app.is_busy());
    }

    #[tokio::test]
    async fn esc_without_search_is_not_reported_as_refused() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host);

        press(&mut h, KeyCode::Char('x'));
        press(&mut h, KeyCode::Char('y'));
        assert!(matches!(h.app.workflow.state(), WorkflowState::Dispatched { .. }));

        let before = h.app.logs.len();
        press(&mut h, KeyCode::Esc);
        assert_eq!(h.app.logs.len(), before);
    }


    #[tokio::test]
    async fn search_typing_filters_live_and_esc_restores() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host);

        press(&mut h, KeyCode::Char('/'));
        press(&mut h, KeyCode::Char('p'));
        press(&mut h, KeyCode::Char('l'));
        assert_eq!(h.app.search_text(), "pl");
        assert_eq!(h.app.current_len(), 2);

        press(&mut h, KeyCode::Esc);
        assert_eq!(h.app.search_text(), "");
        assert_eq!(h.app.current_len(), 3);
        assert_eq!(h.app.modal, ModalState::None);
    }

    #[tokio::test]
    async fn esc_without_modal_clears_applied_search() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host);

        press(&mut h, KeyCode::Char('/'));
        press(&mut h, KeyCode::Char('s'));
        press(&mut h, KeyCode::Enter);
        assert_eq!(h.app.current_len(), 1);

        press(&mut h, KeyCode::Esc);
        assert_eq!(h.app.search_text(), "");
        assert_eq!(h.app.current_len(), 3);
    }

    #[tokio::test]
    async fn hidden_selection_is_not_deleted() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());

        press(&mut h, KeyCode::Char('A'));
        press(&mut h, KeyCode::Char('/'));
        press(&mut h, KeyCode::Char('s'));
        press(&mut h, KeyCode::Enter);
        press(&mut h, KeyCode::Char('D'));
        assert!(matches!(h.app.modal, ModalState::Confirm { count: 1, .. }));
        press(&mut h, KeyCode::Char('y'));
        pump_event(&mut h).await;

        assert_eq!(
            host.executed.lock().expect("lock").clone(),
            vec![HostCommand::DeleteMany {
                document: "site".to_string(),
                ids: vec![ElementId(3)],
            }]
        );
    }

    #[tokio::test]
    async fn startup_enumeration_failure_is_notified() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());

        handle_backend_event(
            &mut h.app,
            &h.backend,
            BackendEvent::Reloaded {
                reason: ReloadReason::Startup,
                context: host.context(),
                snapshot: Err(WorkflowError::EnumerationFailure("closed".to_string())),
            },
        )
        .expect("event");

        assert_eq!(h.app.collection.len(), 3);
        assert!(h.app.notice.as_ref().is_some_and(|n| n.level == NoticeLevel::Error));
    }

    #[tokio::test]
    async fn go_to_view_updates_active_view_without_reload() {
        let host = Arc::new(ScriptedHost::default());
        let mut h = harness(host.clone());
        h.app.collection = {
            let mut collection = crate::collection::ImportCollection::default();
            let mut entry = Entry::new(ElementId(7), "detail.dwg");
            entry.owner_view_id = Some(ElementId(11));
            entry.owner_view_name = "Site Plan".to_string();
            entry.view_specific = true;
            collection.load(vec![entry]).expect("load");
            collection
        };

        press(&mut h, KeyCode::Char('g'));
        assert!(h.app.is_busy());
        handle_backend_event(
            &mut h.app,
            &h.backend,
            BackendEvent::CommandFinished {
                kind: CommandKind::ChangeActiveView,
                outcome: Ok(HostReport {
                    active_view: Some("Site Plan".to_string()),
                    ..HostReport::default()
                }),
            },
        )
        .expect("event");

        assert!(!h.app.is_busy());
        assert_eq!(h.app.host.active_view.as_deref(), Some("Site Plan"));
        assert!(h.task_rx.try_recv().is_err());
    }
}
