//! JSON shapes exchanged with the remote API.

use crate::models::{ActivityRecord, AttendanceRecord, Palm, VerifiedBy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub struct ActivityItem<'a> {
    pub id: &'a str,
    pub palm_id: &'a str,
    pub activity_type: &'a str,
    pub data: &'a Map<String, Value>,
    pub synced: bool,
    pub created_at: i64,
}

impl<'a> From<&'a ActivityRecord> for ActivityItem<'a> {
    fn from(r: &'a ActivityRecord) -> Self {
        Self {
            id: &r.id,
            palm_id: &r.palm_id,
            activity_type: r.activity_type.as_str(),
            data: &r.payload,
            synced: r.sync_state.is_synced(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttendanceItem<'a> {
    pub id: &'a str,
    pub employee_id: &'a str,
    pub check_in: i64,
    pub check_out: Option<i64>,
    pub synced: bool,
    pub created_at: i64,
}

impl<'a> From<&'a AttendanceRecord> for AttendanceItem<'a> {
    fn from(r: &'a AttendanceRecord) -> Self {
        Self {
            id: &r.id,
            employee_id: &r.employee_id,
            check_in: r.check_in_at,
            check_out: r.check_out_at,
            synced: r.sync_state.is_synced(),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivitiesSyncBody<'a> {
    pub activities: Vec<ActivityItem<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceSyncBody<'a> {
    pub attendance: Vec<AttendanceItem<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RejectedRecord {
    pub id: String,
    pub error: String,
}

/// Outcome of one bulk-sync call. `rejected` names the records the remote
/// refused; servers that omit it only report aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub synced: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityBody<'a> {
    pub palm_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<&'a str>,
    pub worker_id: &'a str,
    pub activity_type: &'a str,
    pub activity_date: Value,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
    pub client_id: &'a str,
}

const WELL_KNOWN_KEYS: [&str; 5] = [
    "workerId",
    "activityDate",
    "notes",
    "gpsLatitude",
    "gpsLongitude",
];

impl<'a> From<&'a ActivityRecord> for CreateActivityBody<'a> {
    fn from(r: &'a ActivityRecord) -> Self {
        let details = r
            .payload
            .iter()
            .filter(|(k, _)| !WELL_KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let qr_code = crate::utils::palm_id::validate(&r.palm_id).then_some(r.palm_id.as_str());

        Self {
            palm_id: &r.palm_id,
            qr_code,
            worker_id: r.worker_id().unwrap_or_default(),
            activity_type: r.activity_type.as_str(),
            activity_date: r
                .payload
                .get("activityDate")
                .cloned()
                .unwrap_or(Value::from(r.created_at)),
            details,
            notes: r.payload.get("notes").and_then(Value::as_str),
            gps_latitude: r.payload.get("gpsLatitude").and_then(Value::as_f64),
            gps_longitude: r.payload.get("gpsLongitude").and_then(Value::as_f64),
            client_id: &r.id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInBody<'a> {
    pub employee_id: &'a str,
    pub check_in: i64,
    pub verified_by: VerifiedBy,
    pub client_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutBody<'a> {
    pub employee_id: &'a str,
    pub check_out: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Instants arrive either as epoch milliseconds or as RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireInstant {
    Millis(i64),
    Text(String),
}

impl WireInstant {
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            WireInstant::Millis(ms) => Some(*ms),
            WireInstant::Text(s) => chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttendance {
    pub id: String,
    #[serde(default)]
    pub check_in: Option<WireInstant>,
    #[serde(default)]
    pub check_out: Option<WireInstant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PalmPage {
    #[serde(alias = "palms")]
    pub items: Vec<Palm>,
    #[serde(default)]
    pub total: u64,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityInput, ActivityType};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn activity_item_uses_snake_case_wire_names() {
        let date = Utc.with_ymd_and_hms(2026, 5, 2, 6, 0, 0).unwrap();
        let input = ActivityInput::new("RP-A1-00001", ActivityType::Pruning, "W1", date);
        let record = ActivityRecord::from_input(&input, "local-1".into(), 42);

        let v = serde_json::to_value(ActivityItem::from(&record)).unwrap();
        assert_eq!(v["palm_id"], "RP-A1-00001");
        assert_eq!(v["activity_type"], "PRUNING");
        assert_eq!(v["data"]["workerId"], "W1");
        assert_eq!(v["synced"], false);
        assert_eq!(v["created_at"], 42);
    }

    #[test]
    fn create_body_splits_details_from_known_keys() {
        let date = Utc.with_ymd_and_hms(2026, 5, 2, 6, 0, 0).unwrap();
        let mut input = ActivityInput::new("RP-A1-00001", ActivityType::Spraying, "W1", date);
        input.details.insert("litres".into(), json!(4));
        input.notes = Some("windy".into());
        let record = ActivityRecord::from_input(&input, "local-1".into(), 42);

        let v = serde_json::to_value(CreateActivityBody::from(&record)).unwrap();
        assert_eq!(v["qrCode"], "RP-A1-00001");
        assert_eq!(v["details"], json!({"litres": 4}));
        assert_eq!(v["notes"], "windy");
        assert_eq!(v["clientId"], "local-1");
        assert!(v.get("gpsLatitude").is_none());
    }

    #[test]
    fn palm_page_accepts_legacy_key() {
        let page: PalmPage = serde_json::from_value(json!({
            "palms": [{"id": "p1", "qrCode": "RP-A1-00001", "blockId": "b1", "status": "ACTIVE"}],
            "total": 1,
            "hasMore": false
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_more);
    }

    #[test]
    fn remote_attendance_accepts_iso_and_millis() {
        let r: RemoteAttendance = serde_json::from_value(json!({
            "id": "r1",
            "checkIn": "2026-05-02T06:00:00.000Z",
            "checkOut": 1777708800000i64
        }))
        .unwrap();
        assert_eq!(
            r.check_in.unwrap().to_millis(),
            Some(Utc.with_ymd_and_hms(2026, 5, 2, 6, 0, 0).unwrap().timestamp_millis())
        );
        assert_eq!(r.check_out.unwrap().to_millis(), Some(1777708800000));
    }
}
