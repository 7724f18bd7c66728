use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyberIncident {
    pub incident_id: i64,
    pub domain: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub reported_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItIncident {
    pub incident_id: i64,
    pub service_name: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub detected_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}
