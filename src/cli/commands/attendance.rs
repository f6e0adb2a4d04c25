use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::{FieldSync, WriteOutcome};
use crate::errors::AppResult;
use crate::models::{CheckInInput, VerifiedBy};
use crate::ui::messages::{success, warning};
use crate::utils::time::{format_millis, now_millis, parse_optional_at};

fn report(action: &str, employee: &str, at: i64, outcome: &WriteOutcome) {
    if outcome.synced {
        success(format!(
            "{} {} at {} (synced, id {})",
            action,
            employee,
            format_millis(at),
            outcome.id
        ));
    } else {
        warning(format!(
            "{} {} at {} saved offline; queued for sync (id {})",
            action,
            employee,
            format_millis(at),
            outcome.id
        ));
    }
}

pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Checkin {
            employee,
            at,
            verified_by,
        } => {
            let at = parse_optional_at(at.as_ref())?.unwrap_or_else(now_millis);
            let input = CheckInInput {
                employee_id: employee.clone(),
                check_in_at: at,
                verified_by: VerifiedBy::from_code(verified_by)?,
            };

            let app = FieldSync::from_config(cfg)?;
            let outcome = app.writer.check_in(input).await?;
            report("Checked in", employee, at, &outcome);
        }

        Commands::Checkout { employee, at } => {
            let at = parse_optional_at(at.as_ref())?.unwrap_or_else(now_millis);

            let app = FieldSync::from_config(cfg)?;
            let outcome = app.writer.check_out(employee, at).await?;
            report("Checked out", employee, at, &outcome);
        }

        _ => {}
    }

    Ok(())
}
