use crate::error::DbError;

const SCHEMA_SQL: &str = r#"
-- Tenants. Plan limits live on the row; -1 means unlimited.
CREATE TABLE IF NOT EXISTS organizations (
    id                         TEXT PRIMARY KEY,
    name                       TEXT NOT NULL,
    max_scans_per_month        INTEGER NOT NULL DEFAULT -1,
    max_api_requests_per_month INTEGER NOT NULL DEFAULT -1,
    created_at                 INTEGER NOT NULL
);

-- Assets registered for scanning.
CREATE TABLE IF NOT EXISTS scan_targets (
    id              TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name            TEXT NOT NULL,
    target_type     TEXT NOT NULL,
    target_value    TEXT NOT NULL,
    is_active       INTEGER NOT NULL DEFAULT 1,
    scan_frequency  TEXT NOT NULL DEFAULT 'weekly',
    last_scan_at    INTEGER,
    next_scan_at    INTEGER,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL,
    UNIQUE(organization_id, target_value)
);
CREATE INDEX IF NOT EXISTS idx_targets_org ON scan_targets(organization_id);
CREATE INDEX IF NOT EXISTS idx_targets_due ON scan_targets(is_active, next_scan_at);

-- One row per scan execution. Severity tallies and risk_score are derived
-- from the finding rows at completion time.
CREATE TABLE IF NOT EXISTS scans (
    id              TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    target_id       TEXT NOT NULL REFERENCES scan_targets(id) ON DELETE CASCADE,
    scan_type       TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'pending',
    started_at      INTEGER NOT NULL,
    completed_at    INTEGER,
    duration_ms     INTEGER,
    critical_count  INTEGER NOT NULL DEFAULT 0,
    high_count      INTEGER NOT NULL DEFAULT 0,
    medium_count    INTEGER NOT NULL DEFAULT 0,
    low_count       INTEGER NOT NULL DEFAULT 0,
    info_count      INTEGER NOT NULL DEFAULT 0,
    risk_score      INTEGER,
    error_message   TEXT,
    created_at      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scans_org ON scans(organization_id, created_at);
CREATE INDEX IF NOT EXISTS idx_scans_target ON scans(target_id);

-- Findings are children of a scan. "references" is an SQL keyword, hence
-- references_json.
CREATE TABLE IF NOT EXISTS findings (
    id                 TEXT PRIMARY KEY,
    scan_id            TEXT NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
    cve_id             TEXT,
    title              TEXT NOT NULL,
    description        TEXT NOT NULL,
    severity           TEXT NOT NULL,
    cvss_score         REAL,
    affected_component TEXT,
    recommendation     TEXT,
    references_json    TEXT NOT NULL DEFAULT '[]',
    is_false_positive  INTEGER NOT NULL DEFAULT 0,
    is_resolved        INTEGER NOT NULL DEFAULT 0,
    resolved_at        INTEGER,
    created_at         INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_findings_scan ON findings(scan_id);
CREATE INDEX IF NOT EXISTS idx_findings_severity ON findings(severity);

-- Monthly metered usage per (organization, metric). Consumption is a
-- conditional increment against the plan limit inside one transaction.
CREATE TABLE IF NOT EXISTS usage_counters (
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    metric          TEXT NOT NULL,
    year            INTEGER NOT NULL,
    month           INTEGER NOT NULL,
    count           INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (organization_id, metric, year, month)
);

-- CVE entries (known vulnerabilities)
CREATE TABLE IF NOT EXISTS cve_entries (
    cve_id         TEXT PRIMARY KEY,
    cvss_score     REAL,
    description    TEXT NOT NULL,
    published_date TEXT,
    reference_url  TEXT,
    source         TEXT NOT NULL DEFAULT 'bundled'
);

-- CVE metadata (tracks bundled version, last feed update, etc.)
CREATE TABLE IF NOT EXISTS cve_metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

pub fn initialize(conn: &rusqlite::Connection) -> Result<(), DbError> {
    // Set WAL mode and foreign keys BEFORE schema creation for crash safety
    // and foreign key enforcement during initial DDL.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
