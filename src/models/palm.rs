use serde::{Deserialize, Serialize};

/// Remote reference data for one palm, as served by `GET /palms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palm {
    pub id: String,
    pub qr_code: String,
    pub block_id: String,
    #[serde(default)]
    pub block_name: String,
    #[serde(default)]
    pub block_code: String,
    #[serde(default)]
    pub row_number: Option<i64>,
    #[serde(default)]
    pub column_number: Option<i64>,
    #[serde(default)]
    pub planting_date: Option<String>,
    #[serde(default)]
    pub variety: Option<String>,
    pub status: String,
}

/// A cached palm plus the instant it was written locally.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPalm {
    pub palm: Palm,
    pub cached_at: i64,
}
