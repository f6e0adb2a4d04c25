use super::wire::{
    ActivitiesSyncBody, ActivityItem, AttendanceItem, AttendanceSyncBody, CheckInBody,
    CheckOutBody, CreateActivityBody, CreatedResponse, ErrorBody,
};
use super::{BatchResponse, PalmPage, RemoteAttendance, RemoteError, RemoteService};
use crate::errors::{AppError, AppResult};
use crate::models::{ActivityRecord, AttendanceRecord, Palm};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// REST client for the field-data API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, timeout: Duration, auth_token: Option<String>) -> AppResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid api_base_url '{}': {}", base_url, e)))?;
        // `Url::join` drops the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fieldsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RemoteError::Network(format!("bad endpoint '{}': {}", path, e)))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> Result<R, RemoteError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");

        let mut req = self.authorize(self.client.post(url)).json(body);
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }

        let resp = req.send().await.map_err(classify)?;
        decode(resp).await
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<R, RemoteError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");

        let resp = self
            .authorize(self.client.get(url))
            .query(query)
            .send()
            .await
            .map_err(classify)?;
        decode(resp).await
    }
}

fn classify(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else if err.is_decode() {
        RemoteError::Decode(err.to_string())
    } else {
        RemoteError::Network(err.to_string())
    }
}

async fn decode<R: DeserializeOwned>(resp: Response) -> Result<R, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    status.canonical_reason().unwrap_or("error").to_string()
                } else {
                    text
                }
            });
        return Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let bytes = resp.bytes().await.map_err(classify)?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteService for HttpRemote {
    #[instrument(skip_all, fields(id = %record.id))]
    async fn create_activity(&self, record: &ActivityRecord) -> Result<String, RemoteError> {
        let body = CreateActivityBody::from(record);
        let created: CreatedResponse = self
            .post_json("activities/create", &body, Some(&record.id))
            .await?;
        Ok(created.id)
    }

    #[instrument(skip_all, fields(id = %record.id, employee = %record.employee_id))]
    async fn check_in(&self, record: &AttendanceRecord) -> Result<String, RemoteError> {
        let body = CheckInBody {
            employee_id: &record.employee_id,
            check_in: record.check_in_at,
            verified_by: record.verified_by,
            client_id: &record.id,
        };
        let created: CreatedResponse = self
            .post_json("attendance/check-in", &body, Some(&record.id))
            .await?;
        Ok(created.id)
    }

    #[instrument(skip(self))]
    async fn check_out(
        &self,
        employee_id: &str,
        check_out_at: i64,
        client_id: &str,
    ) -> Result<RemoteAttendance, RemoteError> {
        let body = CheckOutBody {
            employee_id,
            check_out: check_out_at,
        };
        let key = format!("{}:out:{}", client_id, check_out_at);
        self.post_json("attendance/check-out", &body, Some(&key)).await
    }

    #[instrument(skip_all, fields(batch = batch.len()))]
    async fn sync_activities(&self, batch: &[ActivityRecord]) -> Result<BatchResponse, RemoteError> {
        let body = ActivitiesSyncBody {
            activities: batch.iter().map(ActivityItem::from).collect(),
        };
        self.post_json("activities/sync", &body, None).await
    }

    #[instrument(skip_all, fields(batch = batch.len()))]
    async fn sync_attendance(
        &self,
        batch: &[AttendanceRecord],
    ) -> Result<BatchResponse, RemoteError> {
        let body = AttendanceSyncBody {
            attendance: batch.iter().map(AttendanceItem::from).collect(),
        };
        self.post_json("attendance/sync", &body, None).await
    }

    #[instrument(skip(self))]
    async fn fetch_palms(&self, page: u32, limit: u32) -> Result<PalmPage, RemoteError> {
        self.get_json(
            "palms",
            &[("page", page.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn fetch_palm(&self, qr_code: &str) -> Result<Palm, RemoteError> {
        let url = self.endpoint("palms/")?;
        let url = url
            .join(qr_code)
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let resp = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(classify)?;
        decode(resp).await
    }
}
