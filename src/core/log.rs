use crate::db::LocalStore;
use crate::db::log::load_log;
use crate::errors::AppResult;
use crate::utils::table::strip_ansi;
use ansi_term::Colour;

const OP_WIDTH: usize = 60;

/// ANSI colour per audit operation.
fn color_for_operation(op: &str) -> Colour {
    match op {
        "sync_pass" => Colour::Green,
        "queue_clear" | "palms_clear" => Colour::Red,
        "palms_refresh" => Colour::Cyan,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(store: &LocalStore) -> AppResult<()> {
        let entries = store.read(|tx| load_log(tx.conn()))?;

        if entries.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let rows: Vec<(i64, String, String, String)> = entries
            .into_iter()
            .map(|e| {
                let date = chrono::DateTime::parse_from_rfc3339(&e.date)
                    .map(|dt| dt.format("%FT%T%:z").to_string())
                    .unwrap_or(e.date);
                let colour = color_for_operation(&e.operation);
                let mut op = colour.paint(e.operation.as_str()).to_string();
                if !e.target.is_empty() {
                    op = format!("{} ({})", op, e.target);
                }
                (e.id, date, op, e.message)
            })
            .collect();

        let id_w = rows.iter().map(|r| r.0.to_string().len()).max().unwrap_or(1);
        let date_w = rows.iter().map(|r| r.1.len()).max().unwrap_or(10);
        let op_w = rows
            .iter()
            .map(|r| strip_ansi(&r.2).chars().count())
            .max()
            .unwrap_or(10)
            .min(OP_WIDTH);

        println!("📜 Internal log:\n");
        for (id, date, op, message) in rows {
            let visible = strip_ansi(&op).chars().count();
            let padding = " ".repeat(op_w.saturating_sub(visible));
            println!(
                "{:>id_w$}: {:<date_w$} | {}{} => {}",
                id,
                date,
                op,
                padding,
                message,
                id_w = id_w,
                date_w = date_w
            );
        }
        Ok(())
    }
}
