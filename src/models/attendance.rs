use super::sync_state::SyncState;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// How the employee's identity was confirmed at check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifiedBy {
    Fingerprint,
    Pin,
    SupervisorOverride,
}

impl VerifiedBy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            VerifiedBy::Fingerprint => "FINGERPRINT",
            VerifiedBy::Pin => "PIN",
            VerifiedBy::SupervisorOverride => "SUPERVISOR_OVERRIDE",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "FINGERPRINT" => Some(VerifiedBy::Fingerprint),
            "PIN" => Some(VerifiedBy::Pin),
            "SUPERVISOR_OVERRIDE" => Some(VerifiedBy::SupervisorOverride),
            _ => None,
        }
    }

    /// Helper: convert input code from CLI
    pub fn from_code(code: &str) -> AppResult<Self> {
        let normalized = code.trim().to_uppercase().replace('-', "_");
        match normalized.as_str() {
            "SUPERVISOR" => Ok(VerifiedBy::SupervisorOverride),
            other => Self::from_db_str(other)
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid verification: {}", code))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckInInput {
    pub employee_id: String,
    pub check_in_at: i64,
    pub verified_by: VerifiedBy,
}

impl CheckInInput {
    pub fn validate(&self) -> AppResult<()> {
        if self.employee_id.trim().is_empty() {
            return Err(AppError::InvalidSubject("empty employee id".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: String,
    pub employee_id: String,
    pub check_in_at: i64,
    pub check_out_at: Option<i64>,
    pub verified_by: VerifiedBy,
    pub sync_state: SyncState,
    pub created_at: i64,
}

impl AttendanceRecord {
    pub fn from_input(input: &CheckInInput, id: String, created_at: i64) -> Self {
        Self {
            id,
            employee_id: input.employee_id.trim().to_string(),
            check_in_at: input.check_in_at,
            check_out_at: None,
            verified_by: input.verified_by,
            sync_state: SyncState::Pending,
            created_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.check_out_at.is_none()
    }

    /// Closing a record is a content change: it re-arms `Pending` until the
    /// check-out reaches the remote side.
    pub fn close(&mut self, check_out_at: i64) -> AppResult<()> {
        if check_out_at < self.check_in_at {
            return Err(AppError::InvalidInput(
                "check-out is earlier than check-in".into(),
            ));
        }
        self.check_out_at = Some(check_out_at);
        self.sync_state = SyncState::Pending;
        Ok(())
    }
}
