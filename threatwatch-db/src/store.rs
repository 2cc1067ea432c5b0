use std::path::{Path, PathBuf};

use chrono::Datelike;
use rusqlite::{params, params_from_iter, Connection, ToSql};
use tracing::debug;
use uuid::Uuid;

use threatwatch_types::{
    now_ms, CveEntry, Finding, FindingRecord, FindingReference, MetricType, Organization,
    QuotaDecision, ScanFrequency, ScanRecord, ScanStatus, ScanTarget, ScanType, Severity,
    SeverityCounts, TargetType,
};

use crate::error::DbError;
use crate::schema;

/// Persistent tenant/scan database backed by SQLite.
pub struct Store {
    conn: Connection,
}

/// Filters for listing scans. All fields are optional and conjunctive.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub target_id: Option<String>,
    pub status: Option<ScanStatus>,
    pub scan_type: Option<ScanType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filters for listing findings. All fields are optional and conjunctive.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub scan_id: Option<String>,
    pub severity: Option<Severity>,
    pub resolved: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Mutable fields of a target. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TargetUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub scan_frequency: Option<ScanFrequency>,
}

/// Review flags on a finding. `None` leaves the flag unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindingReview {
    pub is_false_positive: Option<bool>,
    pub is_resolved: Option<bool>,
}

/// The (year, month) pair usage is metered against.
pub fn current_period() -> (i32, u32) {
    let now = chrono::Utc::now();
    (now.year(), now.month())
}

fn default_db_path() -> PathBuf {
    if cfg!(windows) {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("threatwatch").join("threatwatch.db")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".threatwatch").join("threatwatch.db")
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Store {
    /// Open (or create) the database at the default location.
    pub fn open_default() -> Result<Self, DbError> {
        let path = default_db_path();
        Self::open(&path)
    }

    /// Open a database at a specific path.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::Other(format!(
                    "failed to create db directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        debug!(path = %path.display(), "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    // -----------------------------------------------------------------------
    // Organizations
    // -----------------------------------------------------------------------

    pub fn create_organization(
        &self,
        name: &str,
        max_scans_per_month: i64,
        max_api_requests_per_month: i64,
    ) -> Result<Organization, DbError> {
        let org = Organization {
            id: new_id(),
            name: name.to_string(),
            max_scans_per_month,
            max_api_requests_per_month,
            created_at: now_ms(),
        };
        self.conn.execute(
            "INSERT INTO organizations \
             (id, name, max_scans_per_month, max_api_requests_per_month, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                org.id,
                org.name,
                org.max_scans_per_month,
                org.max_api_requests_per_month,
                org.created_at as i64,
            ],
        )?;
        Ok(org)
    }

    pub fn get_organization(&self, id: &str) -> Result<Option<Organization>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, max_scans_per_month, max_api_requests_per_month, created_at \
             FROM organizations WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Organization {
                id: row.get(0)?,
                name: row.get(1)?,
                max_scans_per_month: row.get(2)?,
                max_api_requests_per_month: row.get(3)?,
                created_at: row.get::<_, i64>(4)? as u64,
            }))
        } else {
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // Targets
    // -----------------------------------------------------------------------

    pub fn create_target(
        &self,
        organization_id: &str,
        name: &str,
        target_type: TargetType,
        target_value: &str,
        scan_frequency: ScanFrequency,
    ) -> Result<ScanTarget, DbError> {
        let now = now_ms();
        // Manual-frequency targets are never scheduled; everything else is
        // due immediately on creation.
        let next_scan_at = if scan_frequency == ScanFrequency::Manual {
            None
        } else {
            Some(now)
        };
        let target = ScanTarget {
            id: new_id(),
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            target_type,
            target_value: target_value.to_string(),
            is_active: true,
            scan_frequency,
            last_scan_at: None,
            next_scan_at,
            created_at: now,
            updated_at: now,
        };
        let inserted = self.conn.execute(
            "INSERT INTO scan_targets \
             (id, organization_id, name, target_type, target_value, is_active, \
              scan_frequency, last_scan_at, next_scan_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, NULL, ?7, ?8, ?8)",
            params![
                target.id,
                target.organization_id,
                target.name,
                target.target_type.to_string(),
                target.target_value,
                target.scan_frequency.to_string(),
                target.next_scan_at.map(|v| v as i64),
                now as i64,
            ],
        );
        match inserted {
            Ok(_) => Ok(target),
            Err(e) if is_unique_violation(&e) => Err(DbError::Conflict(format!(
                "target {target_value} already exists for this organization"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_target(
        &self,
        organization_id: &str,
        id: &str,
    ) -> Result<Option<ScanTarget>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, organization_id, name, target_type, target_value, is_active, \
             scan_frequency, last_scan_at, next_scan_at, created_at, updated_at \
             FROM scan_targets WHERE organization_id = ?1 AND id = ?2",
        )?;
        let mut rows = stmt.query(params![organization_id, id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(target_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn list_targets(&self, organization_id: &str) -> Result<Vec<ScanTarget>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, organization_id, name, target_type, target_value, is_active, \
             scan_frequency, last_scan_at, next_scan_at, created_at, updated_at \
             FROM scan_targets WHERE organization_id = ?1 ORDER BY created_at DESC",
        )?;
        let mut rows = stmt.query(params![organization_id])?;
        let mut targets = Vec::new();
        while let Some(row) = rows.next()? {
            targets.push(target_from_row(row)?);
        }
        Ok(targets)
    }

    pub fn update_target(
        &self,
        organization_id: &str,
        id: &str,
        update: &TargetUpdate,
    ) -> Result<Option<ScanTarget>, DbError> {
        let Some(mut target) = self.get_target(organization_id, id)? else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            target.name = name.clone();
        }
        if let Some(is_active) = update.is_active {
            target.is_active = is_active;
        }
        if let Some(frequency) = update.scan_frequency {
            target.scan_frequency = frequency;
        }
        target.updated_at = now_ms();
        self.conn.execute(
            "UPDATE scan_targets SET name = ?1, is_active = ?2, scan_frequency = ?3, \
             updated_at = ?4 WHERE id = ?5",
            params![
                target.name,
                target.is_active,
                target.scan_frequency.to_string(),
                target.updated_at as i64,
                target.id,
            ],
        )?;
        Ok(Some(target))
    }

    pub fn delete_target(&self, organization_id: &str, id: &str) -> Result<bool, DbError> {
        let deleted = self.conn.execute(
            "DELETE FROM scan_targets WHERE organization_id = ?1 AND id = ?2",
            params![organization_id, id],
        )?;
        Ok(deleted > 0)
    }

    /// Active targets whose next scheduled scan time has passed.
    pub fn due_targets(&self, now: u64) -> Result<Vec<ScanTarget>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, organization_id, name, target_type, target_value, is_active, \
             scan_frequency, last_scan_at, next_scan_at, created_at, updated_at \
             FROM scan_targets \
             WHERE is_active = 1 AND next_scan_at IS NOT NULL AND next_scan_at <= ?1 \
             ORDER BY next_scan_at ASC",
        )?;
        let mut rows = stmt.query(params![now as i64])?;
        let mut targets = Vec::new();
        while let Some(row) = rows.next()? {
            targets.push(target_from_row(row)?);
        }
        Ok(targets)
    }

    /// Record a completed scheduled run: stamps last_scan_at and advances
    /// next_scan_at (NULL for manual-frequency targets).
    pub fn mark_target_scanned(
        &self,
        id: &str,
        last_scan_at: u64,
        next_scan_at: Option<u64>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE scan_targets SET last_scan_at = ?1, next_scan_at = ?2, updated_at = ?1 \
             WHERE id = ?3",
            params![last_scan_at as i64, next_scan_at.map(|v| v as i64), id],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Scans
    // -----------------------------------------------------------------------

    /// Insert a new scan record in `pending` state.
    pub fn create_scan_record(
        &self,
        organization_id: &str,
        target_id: &str,
        scan_type: ScanType,
    ) -> Result<ScanRecord, DbError> {
        let now = now_ms();
        let record = ScanRecord {
            id: new_id(),
            organization_id: organization_id.to_string(),
            target_id: target_id.to_string(),
            scan_type,
            status: ScanStatus::Pending,
            started_at: now,
            completed_at: None,
            duration_ms: None,
            counts: SeverityCounts::default(),
            risk_score: None,
            error: None,
            findings: Vec::new(),
            created_at: now,
        };
        self.conn.execute(
            "INSERT INTO scans (id, organization_id, target_id, scan_type, status, \
             started_at, created_at) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
            params![
                record.id,
                record.organization_id,
                record.target_id,
                record.scan_type.to_string(),
                now as i64,
            ],
        )?;
        Ok(record)
    }

    /// Transition pending -> running. Returns false if the scan is not in
    /// `pending` state (the transition is monotonic, never retried).
    pub fn mark_scan_running(&self, scan_id: &str, started_at: u64) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE scans SET status = 'running', started_at = ?1 \
             WHERE id = ?2 AND status = 'pending'",
            params![started_at as i64, scan_id],
        )?;
        Ok(updated > 0)
    }

    /// Transition running -> completed, writing outcome fields and all
    /// finding rows in one transaction. Returns false (and writes nothing)
    /// if the scan is not in `running` state.
    pub fn complete_scan(
        &self,
        scan_id: &str,
        findings: &[Finding],
        risk_score: u8,
        counts: SeverityCounts,
        completed_at: u64,
    ) -> Result<bool, DbError> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE scans SET status = 'completed', completed_at = ?1, \
             duration_ms = ?1 - started_at, risk_score = ?2, \
             critical_count = ?3, high_count = ?4, medium_count = ?5, \
             low_count = ?6, info_count = ?7 \
             WHERE id = ?8 AND status = 'running'",
            params![
                completed_at as i64,
                risk_score as i64,
                counts.critical,
                counts.high,
                counts.medium,
                counts.low,
                counts.info,
                scan_id,
            ],
        )?;
        if updated == 0 {
            return Ok(false);
        }
        for finding in findings {
            let references_json = serde_json::to_string(&finding.references)?;
            tx.execute(
                "INSERT INTO findings (id, scan_id, cve_id, title, description, severity, \
                 cvss_score, affected_component, recommendation, references_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    new_id(),
                    scan_id,
                    finding.cve_id,
                    finding.title,
                    finding.description,
                    finding.severity.to_string(),
                    finding.cvss_score,
                    finding.affected_component,
                    finding.recommendation,
                    references_json,
                    completed_at as i64,
                ],
            )?;
        }
        tx.commit()?;
        debug!(scan_id, findings = findings.len(), "scan completed");
        Ok(true)
    }

    /// Transition pending/running -> failed with an error message. Findings
    /// are never written for a failed scan.
    pub fn fail_scan(
        &self,
        scan_id: &str,
        error: &str,
        completed_at: u64,
    ) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE scans SET status = 'failed', error_message = ?1, completed_at = ?2, \
             duration_ms = ?2 - started_at \
             WHERE id = ?3 AND status IN ('pending', 'running')",
            params![error, completed_at as i64, scan_id],
        )?;
        Ok(updated > 0)
    }

    pub fn get_scan(
        &self,
        organization_id: &str,
        scan_id: &str,
    ) -> Result<Option<ScanRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCAN_COLUMNS} FROM scans WHERE organization_id = ?1 AND id = ?2"
        ))?;
        let mut rows = stmt.query(params![organization_id, scan_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut record = scan_from_row(row)?;
        record.findings = self.findings_for_scan(scan_id)?;
        Ok(Some(record))
    }

    /// List scans for an organization, newest first. Findings are not
    /// attached; fetch a single scan for those.
    pub fn list_scans(
        &self,
        organization_id: &str,
        filter: &ScanFilter,
    ) -> Result<Vec<ScanRecord>, DbError> {
        let mut sql = format!("{SCAN_COLUMNS} FROM scans WHERE organization_id = ?1");
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(organization_id.to_string())];

        if let Some(target_id) = &filter.target_id {
            args.push(Box::new(target_id.clone()));
            sql.push_str(&format!(" AND target_id = ?{}", args.len()));
        }
        if let Some(status) = filter.status {
            args.push(Box::new(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        if let Some(scan_type) = filter.scan_type {
            args.push(Box::new(scan_type.to_string()));
            sql.push_str(&format!(" AND scan_type = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY created_at DESC");
        args.push(Box::new(i64::from(filter.limit.unwrap_or(50))));
        sql.push_str(&format!(" LIMIT ?{}", args.len()));
        args.push(Box::new(i64::from(filter.offset.unwrap_or(0))));
        sql.push_str(&format!(" OFFSET ?{}", args.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args.iter().map(|a| a.as_ref())))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(scan_from_row(row)?);
        }
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Findings
    // -----------------------------------------------------------------------

    pub fn findings_for_scan(&self, scan_id: &str) -> Result<Vec<FindingRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "{FINDING_COLUMNS} FROM findings WHERE scan_id = ?1 ORDER BY created_at ASC, id ASC"
        ))?;
        let mut rows = stmt.query(params![scan_id])?;
        let mut findings = Vec::new();
        while let Some(row) = rows.next()? {
            findings.push(finding_from_row(row)?);
        }
        Ok(findings)
    }

    /// List findings across an organization's scans, newest first.
    pub fn list_findings(
        &self,
        organization_id: &str,
        filter: &FindingFilter,
    ) -> Result<Vec<FindingRecord>, DbError> {
        let mut sql = format!(
            "{FINDING_COLUMNS_QUALIFIED} FROM findings f \
             INNER JOIN scans s ON f.scan_id = s.id WHERE s.organization_id = ?1"
        );
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(organization_id.to_string())];

        if let Some(scan_id) = &filter.scan_id {
            args.push(Box::new(scan_id.clone()));
            sql.push_str(&format!(" AND f.scan_id = ?{}", args.len()));
        }
        if let Some(severity) = filter.severity {
            args.push(Box::new(severity.to_string()));
            sql.push_str(&format!(" AND f.severity = ?{}", args.len()));
        }
        if let Some(resolved) = filter.resolved {
            args.push(Box::new(resolved));
            sql.push_str(&format!(" AND f.is_resolved = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY f.created_at DESC, f.id ASC");
        args.push(Box::new(i64::from(filter.limit.unwrap_or(100))));
        sql.push_str(&format!(" LIMIT ?{}", args.len()));
        args.push(Box::new(i64::from(filter.offset.unwrap_or(0))));
        sql.push_str(&format!(" OFFSET ?{}", args.len()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(args.iter().map(|a| a.as_ref())))?;
        let mut findings = Vec::new();
        while let Some(row) = rows.next()? {
            findings.push(finding_from_row(row)?);
        }
        Ok(findings)
    }

    /// Update the review flags on a finding. Everything else about a finding
    /// is immutable once written. Setting `is_resolved` stamps or clears
    /// `resolved_at`.
    pub fn review_finding(
        &self,
        organization_id: &str,
        finding_id: &str,
        review: &FindingReview,
        now: u64,
    ) -> Result<Option<FindingRecord>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "{FINDING_COLUMNS_QUALIFIED} FROM findings f \
             INNER JOIN scans s ON f.scan_id = s.id \
             WHERE s.organization_id = ?1 AND f.id = ?2"
        ))?;
        let mut rows = stmt.query(params![organization_id, finding_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut record = finding_from_row(row)?;
        drop(rows);
        drop(stmt);

        if let Some(is_false_positive) = review.is_false_positive {
            record.is_false_positive = is_false_positive;
        }
        if let Some(is_resolved) = review.is_resolved {
            record.is_resolved = is_resolved;
            record.resolved_at = if is_resolved { Some(now) } else { None };
        }
        self.conn.execute(
            "UPDATE findings SET is_false_positive = ?1, is_resolved = ?2, resolved_at = ?3 \
             WHERE id = ?4",
            params![
                record.is_false_positive,
                record.is_resolved,
                record.resolved_at.map(|v| v as i64),
                record.id,
            ],
        )?;
        Ok(Some(record))
    }

    // -----------------------------------------------------------------------
    // Usage metering
    // -----------------------------------------------------------------------

    /// Consume one unit of a metric for the given period, atomically against
    /// the plan limit. Two concurrent callers at limit-1 cannot both pass:
    /// the increment and the comparison are one conditional UPDATE.
    pub fn try_consume(
        &self,
        org: &Organization,
        metric: MetricType,
        year: i32,
        month: u32,
    ) -> Result<QuotaDecision, DbError> {
        let limit = org.limit_for(metric);
        let metric = metric.to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO usage_counters (organization_id, metric, year, month, count) \
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![org.id, metric, year, month],
        )?;
        let updated = tx.execute(
            "UPDATE usage_counters SET count = count + 1 \
             WHERE organization_id = ?1 AND metric = ?2 AND year = ?3 AND month = ?4 \
             AND (?5 < 0 OR count < ?5)",
            params![org.id, metric, year, month, limit],
        )?;
        let used: i64 = tx.query_row(
            "SELECT count FROM usage_counters \
             WHERE organization_id = ?1 AND metric = ?2 AND year = ?3 AND month = ?4",
            params![org.id, metric, year, month],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(QuotaDecision {
            allowed: updated > 0,
            used,
            limit,
        })
    }

    /// Units consumed so far in a period, without consuming.
    pub fn current_usage(
        &self,
        organization_id: &str,
        metric: MetricType,
        year: i32,
        month: u32,
    ) -> Result<i64, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT count FROM usage_counters \
             WHERE organization_id = ?1 AND metric = ?2 AND year = ?3 AND month = ?4",
        )?;
        let mut rows = stmt.query(params![organization_id, metric.to_string(), year, month])?;
        if let Some(row) = rows.next()? {
            Ok(row.get(0)?)
        } else {
            Ok(0)
        }
    }

    // -----------------------------------------------------------------------
    // CVE entries
    // -----------------------------------------------------------------------

    /// Insert or update a CVE entry.
    pub fn upsert_cve(&self, entry: &CveEntry) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cve_entries \
             (cve_id, cvss_score, description, published_date, reference_url, source) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.cve_id,
                entry.cvss_score,
                entry.description,
                entry.published_date,
                entry.reference_url,
                entry.source,
            ],
        )?;
        Ok(())
    }

    /// Bulk import CVE entries in a single transaction.
    pub fn bulk_import_cves(&self, entries: &[CveEntry]) -> Result<usize, DbError> {
        let tx = self.conn.unchecked_transaction()?;
        for entry in entries {
            tx.execute(
                "INSERT OR REPLACE INTO cve_entries \
                 (cve_id, cvss_score, description, published_date, reference_url, source) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.cve_id,
                    entry.cvss_score,
                    entry.description,
                    entry.published_date,
                    entry.reference_url,
                    entry.source,
                ],
            )?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    /// The most recently published CVEs at or above a CVSS floor.
    pub fn recent_high_severity_cves(
        &self,
        min_cvss: f64,
        limit: usize,
    ) -> Result<Vec<CveEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT cve_id, cvss_score, description, published_date, reference_url, source \
             FROM cve_entries WHERE cvss_score >= ?1 \
             ORDER BY published_date DESC LIMIT ?2",
        )?;
        let mut rows = stmt.query(params![min_cvss, limit as i64])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(CveEntry {
                cve_id: row.get(0)?,
                cvss_score: row.get(1)?,
                description: row.get(2)?,
                published_date: row.get(3)?,
                reference_url: row.get(4)?,
                source: row.get(5)?,
            });
        }
        Ok(entries)
    }

    pub fn get_cve_metadata(&self, key: &str) -> Result<Option<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM cve_metadata WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn set_cve_metadata(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cve_metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

const SCAN_COLUMNS: &str = "SELECT id, organization_id, target_id, scan_type, status, \
     started_at, completed_at, duration_ms, critical_count, high_count, medium_count, \
     low_count, info_count, risk_score, error_message, created_at";

const FINDING_COLUMNS: &str = "SELECT id, scan_id, cve_id, title, description, severity, \
     cvss_score, affected_component, recommendation, references_json, is_false_positive, \
     is_resolved, resolved_at, created_at";

const FINDING_COLUMNS_QUALIFIED: &str =
    "SELECT f.id, f.scan_id, f.cve_id, f.title, f.description, f.severity, \
     f.cvss_score, f.affected_component, f.recommendation, f.references_json, \
     f.is_false_positive, f.is_resolved, f.resolved_at, f.created_at";

fn target_from_row(row: &rusqlite::Row<'_>) -> Result<ScanTarget, DbError> {
    let target_type: String = row.get(3)?;
    let scan_frequency: String = row.get(6)?;
    Ok(ScanTarget {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        target_type: target_type.parse().map_err(DbError::Other)?,
        target_value: row.get(4)?,
        is_active: row.get(5)?,
        scan_frequency: scan_frequency.parse().map_err(DbError::Other)?,
        last_scan_at: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        next_scan_at: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        created_at: row.get::<_, i64>(9)? as u64,
        updated_at: row.get::<_, i64>(10)? as u64,
    })
}

fn scan_from_row(row: &rusqlite::Row<'_>) -> Result<ScanRecord, DbError> {
    let scan_type: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(ScanRecord {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        target_id: row.get(2)?,
        scan_type: scan_type.parse().map_err(DbError::Other)?,
        status: status.parse().map_err(DbError::Other)?,
        started_at: row.get::<_, i64>(5)? as u64,
        completed_at: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
        duration_ms: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
        counts: SeverityCounts {
            critical: row.get(8)?,
            high: row.get(9)?,
            medium: row.get(10)?,
            low: row.get(11)?,
            info: row.get(12)?,
        },
        risk_score: row.get::<_, Option<i64>>(13)?.map(|v| v as u8),
        error: row.get(14)?,
        findings: Vec::new(),
        created_at: row.get::<_, i64>(15)? as u64,
    })
}

fn finding_from_row(row: &rusqlite::Row<'_>) -> Result<FindingRecord, DbError> {
    let severity: String = row.get(5)?;
    let references_json: String = row.get(9)?;
    let references: Vec<FindingReference> = serde_json::from_str(&references_json)?;
    Ok(FindingRecord {
        id: row.get(0)?,
        scan_id: row.get(1)?,
        finding: Finding {
            cve_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            severity: severity.parse().map_err(DbError::Other)?,
            cvss_score: row.get(6)?,
            affected_component: row.get(7)?,
            recommendation: row.get(8)?,
            references,
        },
        is_false_positive: row.get(10)?,
        is_resolved: row.get(11)?,
        resolved_at: row.get::<_, Option<i64>>(12)?.map(|v| v as u64),
        created_at: row.get::<_, i64>(13)? as u64,
    })
}
