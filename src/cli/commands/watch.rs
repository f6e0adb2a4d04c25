//! Long-running mode: periodic sync plus connectivity events read from stdin.

use crate::config::Config;
use crate::core::{FieldSync, SyncEvent, SyncPhase};
use crate::errors::AppResult;
use crate::ui::messages::{info, warning};
use crate::utils::colors::colorize_online;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

fn parse_event(line: &str) -> Option<SyncEvent> {
    match line.trim().to_lowercase().as_str() {
        "online" | "up" => Some(SyncEvent::Online),
        "offline" | "down" => Some(SyncEvent::Offline),
        "visible" | "visibility" | "foreground" => Some(SyncEvent::VisibilityRegained),
        "sync" | "tick" => Some(SyncEvent::Tick),
        _ => None,
    }
}

pub async fn handle(cfg: &Config) -> AppResult<()> {
    let app = FieldSync::from_config(cfg)?;
    let coordinator = Arc::clone(&app.coordinator);

    let mut transitions = coordinator.on_transition();
    let printer_status = Arc::clone(&coordinator);
    let printer = tokio::spawn(async move {
        while let Ok(t) = transitions.recv().await {
            match t.to {
                SyncPhase::Syncing => info("Sync started"),
                SyncPhase::Idle => {
                    let s = printer_status.status();
                    info(format!(
                        "Sync finished: {} pending, {} failed ({})",
                        s.pending_count,
                        s.failed_count,
                        colorize_online(s.is_online)
                    ));
                }
            }
        }
    });

    let (tx, rx) = mpsc::channel(16);
    let runner = tokio::spawn(Arc::clone(&coordinator).run(rx));

    info(format!(
        "Watching every {}s; type online / offline / visible, Ctrl-C to stop",
        cfg.sync_interval_secs
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match parse_event(&line) {
                    Some(event) => {
                        debug!(?event, "stdin event");
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => warning(format!("Unknown event '{}'", line.trim())),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(tx);
    if let Err(e) = runner.await {
        warning(format!("Trigger loop ended abnormally: {}", e));
    }
    printer.abort();
    info("Stopped watching");
    Ok(())
}
