use crate::config::Config;
use crate::core::FieldSync;
use crate::errors::AppResult;
use crate::ui::messages::{error, info, success, warning};

pub async fn handle(cfg: &Config) -> AppResult<()> {
    let app = FieldSync::from_config(cfg)?;
    let report = app.coordinator.sync().await?;
    let status = app.coordinator.status();

    if !status.is_online {
        warning("Remote unreachable; nothing was sent.");
        return Ok(());
    }

    for (label, result) in [
        ("Activities", &report.activities),
        ("Attendance", &report.attendance),
    ] {
        info(format!(
            "{:<11} synced {:>4}  failed {:>4}",
            label, result.synced, result.failed
        ));
    }
    for e in report.errors() {
        error(e);
    }

    if report.success() {
        success(format!("Sync complete: {} record(s) sent", report.total_synced()));
    } else {
        warning(format!(
            "Sync finished with {} failure(s); failed records stay queued",
            report.total_failed()
        ));
    }
    Ok(())
}
