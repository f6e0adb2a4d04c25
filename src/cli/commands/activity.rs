use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::FieldSync;
use crate::errors::{AppError, AppResult};
use crate::models::{ActivityInput, ActivityType};
use crate::ui::messages::{success, warning};
use crate::utils::time::{parse_optional_at, to_utc};
use chrono::Utc;
use serde_json::{Map, Value};

/// `key=value` pairs; values that parse as JSON (numbers, booleans) keep
/// their type, anything else is a string.
fn parse_details(pairs: &[String]) -> AppResult<Map<String, Value>> {
    let mut details = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| AppError::InvalidInput(format!("Expected KEY=VALUE, got '{}'", pair)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AppError::InvalidInput(format!("Empty detail key in '{}'", pair)));
        }
        let value = serde_json::from_str::<Value>(raw.trim())
            .ok()
            .filter(|v| !v.is_object() && !v.is_array())
            .unwrap_or_else(|| Value::String(raw.trim().to_string()));
        details.insert(key.to_string(), value);
    }
    Ok(details)
}

pub async fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Activity {
        palm,
        activity_type,
        worker,
        date,
        notes,
        lat,
        lon,
        details,
    } = cmd
    {
        let activity_type = ActivityType::parse(activity_type)?;
        let activity_date = match parse_optional_at(date.as_ref())? {
            Some(ms) => to_utc(ms)
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid date: {}", ms)))?,
            None => Utc::now(),
        };

        let mut input = ActivityInput::new(palm.clone(), activity_type, worker.clone(), activity_date);
        input.details = parse_details(details)?;
        input.notes = notes.clone();
        input.gps_latitude = *lat;
        input.gps_longitude = *lon;

        let app = FieldSync::from_config(cfg)?;
        let outcome = app.writer.record_activity(input).await?;

        if outcome.synced {
            success(format!(
                "{} on {} recorded (synced, id {})",
                activity_type.as_str(),
                palm,
                outcome.id
            ));
        } else {
            warning(format!(
                "{} on {} saved offline; queued for sync (id {})",
                activity_type.as_str(),
                palm,
                outcome.id
            ));
        }
    }

    Ok(())
}
