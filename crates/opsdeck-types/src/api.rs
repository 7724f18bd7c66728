use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between the login handlers (which issue tokens) and the
/// request middleware (which validates them). Canonical definition lives here
/// in opsdeck-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub username: String,
    pub role: String,
    pub token: String,
}

// -- Incidents --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCyberIncident {
    pub domain: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub reported_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewItIncident {
    pub service_name: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub detected_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub incident_id: i64,
}

/// Filters accepted by the incident list endpoints. Membership filters are
/// comma-separated lists; the date range is inclusive on both ends.
/// `service` only applies to the IT endpoint (the cyber table has no
/// service column).
#[derive(Debug, Default, Deserialize)]
pub struct IncidentQuery {
    pub service: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub incident_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CountBucket {
    pub label: String,
    pub count: i64,
}

/// Headline metrics the dashboards render as charts: bar charts over the
/// severity and status buckets, and an incidents-over-time line over the
/// per-day buckets.
#[derive(Debug, Serialize)]
pub struct IncidentSummary {
    pub total: i64,
    pub by_severity: Vec<CountBucket>,
    pub by_status: Vec<CountBucket>,
    pub by_date: Vec<CountBucket>,
}
