//! The remote service contract consumed by the core.
//!
//! `RemoteService` is the seam between the sync engine / hybrid writer and
//! the REST API; `HttpRemote` is the production implementation.

mod http;
pub mod wire;

pub use http::HttpRemote;
pub use wire::{BatchResponse, PalmPage, RejectedRecord, RemoteAttendance};

use crate::models::{ActivityRecord, AttendanceRecord, Palm};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// 4xx other than 408 / 429: the request itself was refused and
    /// repeating it will not help.
    pub fn is_client_error(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }

    /// Human-readable reason, without the status prefix.
    pub fn reason(&self) -> String {
        match self {
            RemoteError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    /// `POST /activities/create`; returns the remote id.
    async fn create_activity(&self, record: &ActivityRecord) -> Result<String, RemoteError>;

    /// `POST /attendance/check-in`; returns the remote id.
    async fn check_in(&self, record: &AttendanceRecord) -> Result<String, RemoteError>;

    /// `POST /attendance/check-out`; returns the closed remote record.
    async fn check_out(
        &self,
        employee_id: &str,
        check_out_at: i64,
        client_id: &str,
    ) -> Result<RemoteAttendance, RemoteError>;

    /// `POST /activities/sync`
    async fn sync_activities(&self, batch: &[ActivityRecord]) -> Result<BatchResponse, RemoteError>;

    /// `POST /attendance/sync`
    async fn sync_attendance(
        &self,
        batch: &[AttendanceRecord],
    ) -> Result<BatchResponse, RemoteError>;

    /// `GET /palms?page&limit` (1-based pages).
    async fn fetch_palms(&self, page: u32, limit: u32) -> Result<PalmPage, RemoteError>;

    /// `GET /palms/{qrCode}`
    async fn fetch_palm(&self, qr_code: &str) -> Result<Palm, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> RemoteError {
        RemoteError::Status {
            status: code,
            message: "x".into(),
        }
    }

    #[test]
    fn client_errors_exclude_timeouts_and_throttling() {
        assert!(status(400).is_client_error());
        assert!(status(404).is_client_error());
        assert!(!status(408).is_client_error());
        assert!(!status(429).is_client_error());
        assert!(!status(500).is_client_error());
        assert!(!RemoteError::Timeout.is_client_error());
        assert!(!RemoteError::Network("reset".into()).is_client_error());
    }
}
