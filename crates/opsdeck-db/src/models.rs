/// Database row types — these map directly to SQLite rows.
/// Distinct from opsdeck-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

pub struct CyberIncidentRow {
    pub incident_id: i64,
    pub domain: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub reported_at: String,
}

pub struct ItIncidentRow {
    pub incident_id: i64,
    pub service_name: String,
    pub incident_type: String,
    pub severity: String,
    pub status: String,
    pub detected_at: String,
    pub resolved_at: Option<String>,
}

/// Column-membership and date-range filters for the incident list queries.
/// Empty membership lists mean "no filter on that column". Date bounds are
/// inclusive `YYYY-MM-DD` strings compared against the date part of the
/// incident timestamp.
#[derive(Debug, Default, Clone)]
pub struct IncidentFilter {
    /// Only it_incidents has a service_name column; the cyber query ignores
    /// this list.
    pub services: Vec<String>,
    pub severities: Vec<String>,
    pub statuses: Vec<String>,
    pub incident_types: Vec<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}
