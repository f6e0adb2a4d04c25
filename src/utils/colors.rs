/// ANSI color helpers for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";

use crate::models::SyncState;

pub fn color_for_state(state: SyncState) -> &'static str {
    match state {
        SyncState::Pending => YELLOW,
        SyncState::Synced => GREEN,
    }
}

pub fn colorize_state(state: SyncState) -> String {
    format!(
        "{}{}{}",
        color_for_state(state),
        state.to_db_str(),
        RESET
    )
}

/// Grey placeholder for empty cells, the value otherwise.
pub fn colorize_optional(value: &str) -> String {
    if value.trim().is_empty() || value.trim() == "--" {
        format!("{GREY}--{RESET}")
    } else {
        value.to_string()
    }
}

pub fn colorize_online(online: bool) -> String {
    if online {
        format!("{GREEN}online{RESET}")
    } else {
        format!("{RED}offline{RESET}")
    }
}
