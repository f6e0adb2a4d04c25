use super::sync_state::SyncState;
use crate::errors::{AppError, AppResult};
use crate::utils::palm_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Fertiliser,
    Harvesting,
    Pruning,
    DiseaseInspection,
    Spraying,
    Weeding,
    Mortality,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::Fertiliser,
        ActivityType::Harvesting,
        ActivityType::Pruning,
        ActivityType::DiseaseInspection,
        ActivityType::Spraying,
        ActivityType::Weeding,
        ActivityType::Mortality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Fertiliser => "FERTILISER",
            ActivityType::Harvesting => "HARVESTING",
            ActivityType::Pruning => "PRUNING",
            ActivityType::DiseaseInspection => "DISEASE_INSPECTION",
            ActivityType::Spraying => "SPRAYING",
            ActivityType::Weeding => "WEEDING",
            ActivityType::Mortality => "MORTALITY",
        }
    }

    /// Case-insensitive; `-` and spaces are accepted in place of `_`.
    pub fn parse(s: &str) -> AppResult<Self> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| AppError::InvalidActivityType(s.to_string()))
    }
}

/// What the field worker submits for one palm.
#[derive(Debug, Clone)]
pub struct ActivityInput {
    pub palm_id: String,
    pub activity_type: ActivityType,
    pub activity_date: DateTime<Utc>,
    pub worker_id: String,
    pub details: Map<String, Value>,
    pub notes: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
}

impl ActivityInput {
    pub fn new(
        palm_id: impl Into<String>,
        activity_type: ActivityType,
        worker_id: impl Into<String>,
        activity_date: DateTime<Utc>,
    ) -> Self {
        Self {
            palm_id: palm_id.into(),
            activity_type,
            activity_date,
            worker_id: worker_id.into(),
            details: Map::new(),
            notes: None,
            gps_latitude: None,
            gps_longitude: None,
        }
    }

    /// Write-boundary type check; the store itself never inspects payloads.
    pub fn validate(&self) -> AppResult<()> {
        if !palm_id::is_resolvable_subject(&self.palm_id) {
            return Err(AppError::InvalidSubject(self.palm_id.clone()));
        }
        if self.worker_id.trim().is_empty() {
            return Err(AppError::InvalidInput("worker id is required".into()));
        }
        if let Some(lat) = self.gps_latitude
            && !(-90.0..=90.0).contains(&lat)
        {
            return Err(AppError::InvalidInput(format!("latitude out of range: {}", lat)));
        }
        if let Some(lon) = self.gps_longitude
            && !(-180.0..=180.0).contains(&lon)
        {
            return Err(AppError::InvalidInput(format!("longitude out of range: {}", lon)));
        }
        Ok(())
    }

    /// Details first, so the well-known keys always win.
    pub fn payload(&self) -> Map<String, Value> {
        let mut data = self.details.clone();
        data.insert("workerId".into(), Value::from(self.worker_id.trim()));
        data.insert(
            "activityDate".into(),
            Value::from(self.activity_date.to_rfc3339()),
        );
        if let Some(notes) = &self.notes {
            data.insert("notes".into(), Value::from(notes.clone()));
        }
        if let Some(lat) = self.gps_latitude {
            data.insert("gpsLatitude".into(), Value::from(lat));
        }
        if let Some(lon) = self.gps_longitude {
            data.insert("gpsLongitude".into(), Value::from(lon));
        }
        data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub id: String,
    pub palm_id: String,
    pub activity_type: ActivityType,
    pub payload: Map<String, Value>,
    pub sync_state: SyncState,
    pub created_at: i64,
}

impl ActivityRecord {
    pub fn from_input(input: &ActivityInput, id: String, created_at: i64) -> Self {
        Self {
            id,
            palm_id: input.palm_id.trim().to_string(),
            activity_type: input.activity_type,
            payload: input.payload(),
            sync_state: SyncState::Pending,
            created_at,
        }
    }

    pub fn worker_id(&self) -> Option<&str> {
        self.payload.get("workerId").and_then(Value::as_str)
    }
}
