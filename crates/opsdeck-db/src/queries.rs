use crate::Database;
use crate::models::{CyberIncidentRow, IncidentFilter, ItIncidentRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn insert_user(&self, username: &str, password_hash: &str, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
                (username, password_hash, role),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Cybersecurity incidents --

    pub fn insert_cyber_incident(
        &self,
        domain: &str,
        incident_type: &str,
        severity: &str,
        status: &str,
        reported_at: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cyber_incidents (domain, incident_type, severity, status, reported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (domain, incident_type, severity, status, reported_at),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_cyber_incidents(&self, filter: &IncidentFilter) -> Result<Vec<CyberIncidentRow>> {
        self.with_conn(|conn| {
            let mut args = Vec::new();
            let sql = format!(
                "SELECT incident_id, domain, incident_type, severity, status, reported_at
                 FROM cyber_incidents{}
                 ORDER BY reported_at DESC",
                filter_clause(filter, None, "reported_at", &mut args),
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), |row| {
                    Ok(CyberIncidentRow {
                        incident_id: row.get(0)?,
                        domain: row.get(1)?,
                        incident_type: row.get(2)?,
                        severity: row.get(3)?,
                        status: row.get(4)?,
                        reported_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_cyber_by(&self, column: IncidentColumn) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| count_grouped(conn, "cyber_incidents", column.as_str()))
    }

    pub fn count_cyber_total(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM cyber_incidents", [], |row| row.get(0))?)
        })
    }

    pub fn count_cyber_by_date(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| count_by_date(conn, "cyber_incidents", "reported_at"))
    }

    // -- IT operations incidents --

    pub fn insert_it_incident(
        &self,
        service_name: &str,
        incident_type: &str,
        severity: &str,
        status: &str,
        detected_at: &str,
        resolved_at: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO it_incidents (service_name, incident_type, severity, status, detected_at, resolved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (service_name, incident_type, severity, status, detected_at, resolved_at),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_it_incidents(&self, filter: &IncidentFilter) -> Result<Vec<ItIncidentRow>> {
        self.with_conn(|conn| {
            let mut args = Vec::new();
            let sql = format!(
                "SELECT incident_id, service_name, incident_type, severity, status, detected_at, resolved_at
                 FROM it_incidents{}
                 ORDER BY detected_at DESC",
                filter_clause(filter, Some("service_name"), "detected_at", &mut args),
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), |row| {
                    Ok(ItIncidentRow {
                        incident_id: row.get(0)?,
                        service_name: row.get(1)?,
                        incident_type: row.get(2)?,
                        severity: row.get(3)?,
                        status: row.get(4)?,
                        detected_at: row.get(5)?,
                        resolved_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_it_by(&self, column: IncidentColumn) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| count_grouped(conn, "it_incidents", column.as_str()))
    }

    pub fn count_it_total(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM it_incidents", [], |row| row.get(0))?)
        })
    }

    pub fn count_it_by_date(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| count_by_date(conn, "it_incidents", "detected_at"))
    }
}

/// Columns the summary endpoints may group by. Enumerated so grouping never
/// interpolates caller-supplied strings into SQL.
#[derive(Debug, Clone, Copy)]
pub enum IncidentColumn {
    Severity,
    Status,
}

impl IncidentColumn {
    fn as_str(self) -> &'static str {
        match self {
            IncidentColumn::Severity => "severity",
            IncidentColumn::Status => "status",
        }
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn
        .prepare("SELECT id, username, password_hash, role FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
                role: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Build the WHERE clause for an incident list query, pushing bind values
/// into `args` as numbered placeholders. `service_col` is the table's
/// service-name column where one exists; `ts_col` is its timestamp column,
/// with date bounds comparing on the date part so both ends are inclusive.
fn filter_clause(
    filter: &IncidentFilter,
    service_col: Option<&str>,
    ts_col: &str,
    args: &mut Vec<String>,
) -> String {
    let mut clauses = Vec::new();

    let mut membership = vec![
        ("severity", &filter.severities),
        ("status", &filter.statuses),
        ("incident_type", &filter.incident_types),
    ];
    if let Some(col) = service_col {
        membership.insert(0, (col, &filter.services));
    }
    for (col, values) in membership {
        if values.is_empty() {
            continue;
        }
        let marks: Vec<String> = values
            .iter()
            .map(|v| {
                args.push(v.clone());
                format!("?{}", args.len())
            })
            .collect();
        clauses.push(format!("{} IN ({})", col, marks.join(", ")));
    }

    if let Some(from) = &filter.from {
        args.push(from.clone());
        clauses.push(format!("date({}) >= date(?{})", ts_col, args.len()));
    }
    if let Some(to) = &filter.to {
        args.push(to.clone());
        clauses.push(format!("date({}) <= date(?{})", ts_col, args.len()));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn count_grouped(conn: &Connection, table: &str, column: &str) -> Result<Vec<(String, i64)>> {
    // table and column are trusted literals, never caller input
    let sql = format!(
        "SELECT {col}, COUNT(*) FROM {table} GROUP BY {col} ORDER BY {col}",
        col = column,
        table = table,
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Incident counts per calendar day, for the dashboards' over-time line
/// charts.
fn count_by_date(conn: &Connection, table: &str, ts_col: &str) -> Result<Vec<(String, i64)>> {
    // table and ts_col are trusted literals, never caller input
    let sql = format!(
        "SELECT date({col}), COUNT(*) FROM {table} GROUP BY date({col}) ORDER BY date({col})",
        col = ts_col,
        table = table,
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_cyber_incident("finance", "phishing", "High", "Open", "2024-03-01 09:15:00")
            .unwrap();
        db.insert_cyber_incident("retail", "malware", "Critical", "Closed", "2024-03-05 14:00:00")
            .unwrap();
        db.insert_cyber_incident("finance", "ddos", "Low", "Open", "2024-04-10 08:30:00")
            .unwrap();
        db
    }

    #[test]
    fn insert_then_list_all() {
        let db = seeded_db();
        let rows = db.list_cyber_incidents(&IncidentFilter::default()).unwrap();
        assert_eq!(rows.len(), 3);
        // Newest first
        assert_eq!(rows[0].incident_type, "ddos");
    }

    #[test]
    fn membership_filter() {
        let db = seeded_db();
        let filter = IncidentFilter {
            severities: vec!["High".into(), "Critical".into()],
            ..Default::default()
        };
        let rows = db.list_cyber_incidents(&filter).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.severity == "High" || r.severity == "Critical"));
    }

    #[test]
    fn date_range_is_inclusive() {
        let db = seeded_db();
        let filter = IncidentFilter {
            from: Some("2024-03-05".into()),
            to: Some("2024-04-10".into()),
            ..Default::default()
        };
        let rows = db.list_cyber_incidents(&filter).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn combined_filters() {
        let db = seeded_db();
        let filter = IncidentFilter {
            statuses: vec!["Open".into()],
            from: Some("2024-04-01".into()),
            ..Default::default()
        };
        let rows = db.list_cyber_incidents(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].domain, "finance");
    }

    #[test]
    fn summary_counts() {
        let db = seeded_db();
        assert_eq!(db.count_cyber_total().unwrap(), 3);

        let by_status = db.count_cyber_by(IncidentColumn::Status).unwrap();
        assert_eq!(by_status, vec![("Closed".into(), 1), ("Open".into(), 2)]);
    }

    #[test]
    fn daily_counts() {
        let db = seeded_db();
        db.insert_cyber_incident("retail", "phishing", "Low", "Open", "2024-03-01 17:40:00")
            .unwrap();

        let by_date = db.count_cyber_by_date().unwrap();
        assert_eq!(
            by_date,
            vec![
                ("2024-03-01".into(), 2),
                ("2024-03-05".into(), 1),
                ("2024-04-10".into(), 1),
            ]
        );
    }

    #[test]
    fn it_incidents_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert_it_incident("mail", "outage", "High", "Resolved", "2024-05-01 10:00:00", Some("2024-05-01 12:30:00"))
            .unwrap();
        let open_id = db
            .insert_it_incident("vpn", "latency", "Medium", "Open", "2024-05-02 07:45:00", None)
            .unwrap();
        assert_ne!(id, open_id);

        let rows = db.list_it_incidents(&IncidentFilter::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].service_name, "vpn");
        assert!(rows[0].resolved_at.is_none());
        assert_eq!(rows[1].resolved_at.as_deref(), Some("2024-05-01 12:30:00"));
    }

    #[test]
    fn it_service_name_filter() {
        let db = Database::open_in_memory().unwrap();
        db.insert_it_incident("mail", "outage", "High", "Open", "2024-05-01 10:00:00", None)
            .unwrap();
        db.insert_it_incident("vpn", "latency", "Medium", "Open", "2024-05-02 07:45:00", None)
            .unwrap();
        db.insert_it_incident("mail", "latency", "Low", "Open", "2024-05-03 11:20:00", None)
            .unwrap();

        let filter = IncidentFilter {
            services: vec!["mail".into()],
            ..Default::default()
        };
        let rows = db.list_it_incidents(&filter).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.service_name == "mail"));

        // The cyber table has no service column, so the list is ignored there
        let cyber = db.list_cyber_incidents(&filter).unwrap();
        assert!(cyber.is_empty());
    }
}
