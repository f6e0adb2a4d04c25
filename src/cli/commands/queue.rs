use crate::cli::parser::QueueAction;
use crate::config::Config;
use crate::db::LocalStore;
use crate::errors::{AppError, AppResult};
use crate::models::{QueueRecord, RecordKind};
use crate::ui::messages::{info, success};
use crate::utils::colors::{colorize_optional, colorize_state};
use crate::utils::table::Table;
use crate::utils::time::format_millis;

fn parse_kind(code: &str) -> AppResult<RecordKind> {
    RecordKind::from_code(code)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown kind '{}': use activity or attendance", code)))
}

fn detail(record: &QueueRecord) -> String {
    match record {
        QueueRecord::Activity(a) => format!(
            "{} by {}",
            a.activity_type.as_str(),
            a.worker_id().unwrap_or("?")
        ),
        QueueRecord::Attendance(a) => {
            let out = a
                .check_out_at
                .map(format_millis)
                .unwrap_or_else(|| "--".to_string());
            format!("in {} out {}", format_millis(a.check_in_at), colorize_optional(&out))
        }
    }
}

pub fn handle(action: &QueueAction, cfg: &Config) -> AppResult<()> {
    let store = LocalStore::open(cfg.database_path())?;

    match action {
        QueueAction::List { kind, pending } => {
            let kinds = match kind {
                Some(code) => vec![parse_kind(code)?],
                None => RecordKind::ALL.to_vec(),
            };

            let mut table = Table::new(["KIND", "ID", "SUBJECT", "STATE", "CREATED", "DETAIL"]);
            for kind in kinds {
                for record in store.list(kind)? {
                    if *pending && record.is_synced() {
                        continue;
                    }
                    table.add_row(vec![
                        kind.label().to_string(),
                        record.id().to_string(),
                        record.subject_key().to_string(),
                        colorize_state(record.sync_state()),
                        format_millis(record.created_at()),
                        detail(&record),
                    ]);
                }
            }

            if table.is_empty() {
                info("Queue is empty.");
            } else {
                print!("{}", table.render());
            }
        }

        QueueAction::Clear { kind } => {
            let kind = parse_kind(kind)?;
            let removed = store.write(|tx| {
                let removed = tx.clear(kind)?;
                tx.log(
                    "queue_clear",
                    kind.label(),
                    &format!("{} record(s) removed", removed),
                )?;
                Ok(removed)
            })?;
            success(format!("Removed {} {} record(s)", removed, kind.label()));
        }
    }

    Ok(())
}
