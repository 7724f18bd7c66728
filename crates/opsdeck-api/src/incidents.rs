use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use opsdeck_db::models::IncidentFilter;
use opsdeck_db::queries::IncidentColumn;
use opsdeck_types::api::{
    Claims, CountBucket, IncidentQuery, IncidentSummary, InsertResponse, NewCyberIncident,
    NewItIncident,
};
use opsdeck_types::models::{CyberIncident, ItIncident};

use crate::auth::AppStateInner;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// -- Cybersecurity incidents --

pub async fn list_cyber(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<IncidentQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let filter = to_filter(&query);

    // Run blocking DB reads off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_cyber_incidents(&filter))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let incidents: Vec<CyberIncident> = rows
        .into_iter()
        .map(|row| CyberIncident {
            incident_id: row.incident_id,
            domain: row.domain,
            incident_type: row.incident_type,
            severity: row.severity,
            status: row.status,
            reported_at: parse_ts(&row.reported_at, row.incident_id),
        })
        .collect();

    Ok(Json(incidents))
}

pub async fn create_cyber(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewCyberIncident>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let reported_at = req.reported_at.format(TS_FORMAT).to_string();
    let incident_id = tokio::task::spawn_blocking(move || {
        db.db.insert_cyber_incident(
            &req.domain,
            &req.incident_type,
            &req.severity,
            &req.status,
            &reported_at,
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!(user = %claims.sub, incident_id, "cyber incident recorded");

    Ok((StatusCode::CREATED, Json(InsertResponse { incident_id })))
}

pub async fn cyber_summary(
    State(state): State<Arc<AppStateInner>>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let total = db.db.count_cyber_total()?;
        let by_severity = db.db.count_cyber_by(IncidentColumn::Severity)?;
        let by_status = db.db.count_cyber_by(IncidentColumn::Status)?;
        let by_date = db.db.count_cyber_by_date()?;
        Ok::<_, anyhow::Error>(build_summary(total, by_severity, by_status, by_date))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(summary))
}

// -- IT operations incidents --

pub async fn list_it(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<IncidentQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let filter = to_filter(&query);

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_it_incidents(&filter))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let incidents: Vec<ItIncident> = rows
        .into_iter()
        .map(|row| ItIncident {
            incident_id: row.incident_id,
            service_name: row.service_name,
            incident_type: row.incident_type,
            severity: row.severity,
            status: row.status,
            detected_at: parse_ts(&row.detected_at, row.incident_id),
            resolved_at: row.resolved_at.as_deref().map(|s| parse_ts(s, row.incident_id)),
        })
        .collect();

    Ok(Json(incidents))
}

pub async fn create_it(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewItIncident>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let detected_at = req.detected_at.format(TS_FORMAT).to_string();
    let resolved_at = req.resolved_at.map(|t| t.format(TS_FORMAT).to_string());
    let incident_id = tokio::task::spawn_blocking(move || {
        db.db.insert_it_incident(
            &req.service_name,
            &req.incident_type,
            &req.severity,
            &req.status,
            &detected_at,
            resolved_at.as_deref(),
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!(user = %claims.sub, incident_id, "IT incident recorded");

    Ok((StatusCode::CREATED, Json(InsertResponse { incident_id })))
}

pub async fn it_summary(
    State(state): State<Arc<AppStateInner>>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let summary = tokio::task::spawn_blocking(move || {
        let total = db.db.count_it_total()?;
        let by_severity = db.db.count_it_by(IncidentColumn::Severity)?;
        let by_status = db.db.count_it_by(IncidentColumn::Status)?;
        let by_date = db.db.count_it_by_date()?;
        Ok::<_, anyhow::Error>(build_summary(total, by_severity, by_status, by_date))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(summary))
}

// -- Helpers --

fn to_filter(query: &IncidentQuery) -> IncidentFilter {
    IncidentFilter {
        services: split_list(query.service.as_deref()),
        severities: split_list(query.severity.as_deref()),
        statuses: split_list(query.status.as_deref()),
        incident_types: split_list(query.incident_type.as_deref()),
        from: query.from.map(|d| d.format("%Y-%m-%d").to_string()),
        to: query.to.map(|d| d.format("%Y-%m-%d").to_string()),
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_ts(raw: &str, incident_id: i64) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on incident {}: {}", raw, incident_id, e);
        NaiveDateTime::default()
    })
}

fn build_summary(
    total: i64,
    by_severity: Vec<(String, i64)>,
    by_status: Vec<(String, i64)>,
    by_date: Vec<(String, i64)>,
) -> IncidentSummary {
    let bucketize = |counts: Vec<(String, i64)>| {
        counts
            .into_iter()
            .map(|(label, count)| CountBucket { label, count })
            .collect()
    };

    IncidentSummary {
        total,
        by_severity: bucketize(by_severity),
        by_status: bucketize(by_status),
        by_date: bucketize(by_date),
    }
}
