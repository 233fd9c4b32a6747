//! Watch mode: rebuild on every file event under the route directory.

use std::fmt;
use std::path::PathBuf;

use notify::event::CreateKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use routetypes_core::Configuration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::generate;

/// Kind of change that triggers a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Add,
    Change,
    Delete,
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    /// Qualifying events carried by a notify event. Directory creation and
    /// access-only events yield nothing.
    pub fn from_notify(event: &Event) -> Vec<Self> {
        let kind = match event.kind {
            EventKind::Create(CreateKind::Folder) => return Vec::new(),
            EventKind::Create(_) => WatchEventKind::Add,
            EventKind::Modify(_) => WatchEventKind::Change,
            EventKind::Remove(_) => WatchEventKind::Delete,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };
        event
            .paths
            .iter()
            .map(|path| Self {
                kind,
                path: path.clone(),
            })
            .collect()
    }
}

/// Watch the input directory until ctrl-c, rebuilding after each qualifying
/// event. Rebuilds run one at a time on the event loop; a failed rebuild is
/// logged and watching continues.
pub fn run(config: &Configuration) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to create tokio runtime: {err}"))?;
    runtime.block_on(watch_loop(config))
}

async fn watch_loop(config: &Configuration) -> Result<(), String> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |result| {
        let _ = tx.send(result);
    })
    .map_err(|err| format!("Failed to create file watcher: {err}"))?;
    watcher
        .watch(&config.input, RecursiveMode::Recursive)
        .map_err(|err| format!("Failed to watch {}: {err}", config.input.display()))?;

    info!(input = %config.input.display(), "Watching for route changes.");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            result = &mut shutdown => {
                if let Err(err) = result {
                    warn!("Failed to listen for ctrl-c: {err}");
                }
                debug!("Watcher stopping.");
                break;
            }
            maybe = rx.recv() => {
                let Some(result) = maybe else {
                    debug!("Watcher channel closed.");
                    break;
                };
                let event = match result {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("File watcher error: {err}");
                        continue;
                    }
                };
                handle_event(config, &event);
            }
        }
    }

    drop(watcher);
    Ok(())
}

/// Rebuild once if `event` carries a change outside the ignore path. Returns
/// the changes that triggered the rebuild, empty when none ran.
fn handle_event(config: &Configuration, event: &Event) -> Vec<WatchEvent> {
    let events: Vec<WatchEvent> = WatchEvent::from_notify(event)
        .into_iter()
        .filter(|e| !config.is_ignored(&e.path))
        .collect();
    if events.is_empty() {
        return events;
    }
    for e in &events {
        debug!(kind = %e.kind, path = %e.path.display(), "Route change detected.");
    }
    if let Err(err) = generate(config) {
        error!("Rebuild failed: {err}");
    }
    events
}
