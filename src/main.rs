mod actions;
mod app;
mod backend;
mod collection;
mod config;
mod dispatcher;
mod domain;
mod error;
mod filter;
mod handlers;
mod infra;
mod logging;
mod selection;
mod terminal;
mod ui;
mod workflow;

use crate::actions::send_task;
use crate::app::{App, BackendEvent, BackendTask, ReloadReason};
use crate::backend::{BackendHandle, worker_loop};
use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::handlers::{handle_backend_event, handle_key_event};
use crate::infra::{HostDocument, SnapshotHost};
use crate::terminal::{Tui, restore_terminal, setup_terminal};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match AppConfig::load_or_default() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load config, using defaults: {err:#}");
            AppConfig::default()
        }
    };

    let _log_guard = match logging::init(&config.log_level) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    };

    let host = match open_host(&config) {
        Ok(host) => host,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "startup failed");
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    };

    let mut terminal = setup_terminal()?;
    let run_result = run_app(&mut terminal, &config, host).await;

    restore_terminal(&mut terminal)?;
    if let Err(err) = run_result {
        tracing::error!(error = %format!("{err:#}"), "app exited with error");
        eprintln!("{err:#}");
        std::process::exit(1);
    }

    Ok(())
}

fn open_host(config: &AppConfig) -> Result<Arc<dyn HostDocument>> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.document.clone())
        .context("no host document: pass DOCUMENT.json or set `document` in config.toml")?;

    let host = SnapshotHost::open(&path)?;
    tracing::info!(path = %path.display(), "host document opened");
    Ok(Arc::new(host))
}

async fn run_app(terminal: &mut Tui, config: &AppConfig, host: Arc<dyn HostDocument>) -> Result<()> {
    let mut app = App::new(config);

    let (task_tx, task_rx) = mpsc::unbounded_channel::<BackendTask>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BackendEvent>();

    tokio::spawn(worker_loop(host.clone(), task_rx, event_tx.clone()));
    let backend = BackendHandle {
        task_tx,
        event_tx,
        dispatcher: Dispatcher::spawn(host),
    };

    send_task(
        &mut app,
        &backend.task_tx,
        BackendTask::Reload {
            reason: ReloadReason::Startup,
        },
    )?;

    while !app.should_quit {
        while let Ok(event) = event_rx.try_recv() {
            handle_backend_event(&mut app, &backend, event)?;
        }

        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if event::poll(Duration::from_millis(100)).context("event poll failed")?
            && let Event::Key(key) = event::read().context("event read failed")?
            && key.kind == KeyEventKind::Press
        {
            handle_key_event(&mut app, key, &backend)?;
        }
    }

    Ok(())
}
