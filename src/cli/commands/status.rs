use crate::config::Config;
use crate::core::FieldSync;
use crate::errors::AppResult;
use crate::models::RecordKind;
use crate::utils::colors::{colorize_online, colorize_optional};
use crate::utils::time::format_millis;

pub async fn handle(cfg: &Config) -> AppResult<()> {
    let app = FieldSync::from_config(cfg)?;
    let status = app.coordinator.update_status().await?;

    let last = status
        .last_sync_time
        .map(format_millis)
        .unwrap_or_default();

    println!("🔌 Connection : {}", colorize_online(status.is_online));
    for kind in RecordKind::ALL {
        println!(
            "📦 Pending {:<11}: {}",
            kind.label(),
            app.store.count_pending(kind)?
        );
    }
    println!("📦 Pending total     : {}", status.pending_count);
    println!("❗ Failed last pass  : {}", status.failed_count);
    println!("🕒 Last sync         : {}", colorize_optional(&last));
    Ok(())
}
