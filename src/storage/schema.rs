//! Database schema definitions

/// SQL to create the migrations ledger
pub const CREATE_SCHEMA_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)
"#;

/// SQL to create the companies table
pub const CREATE_COMPANIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    global_company_id TEXT NOT NULL UNIQUE,
    dataset_version TEXT NOT NULL,
    name TEXT NOT NULL,
    domain TEXT,
    postal_code TEXT,
    country_code TEXT,
    city TEXT,
    state TEXT,
    region TEXT,
    industry TEXT,
    sector TEXT,
    employee_count INTEGER,
    revenue_estimate REAL,
    final_score REAL NOT NULL,
    d_score REAL NOT NULL,
    o_score REAL NOT NULL,
    i_score REAL NOT NULL,
    m_score REAL NOT NULL,
    b_score REAL NOT NULL,
    confidence_score REAL NOT NULL,
    norm_context_version TEXT NOT NULL,
    checksum TEXT NOT NULL,
    risk_score REAL,
    feasibility_score REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    synced_at TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    tombstone_at TEXT
)
"#;

/// SQL to create the company_aliases table
pub const CREATE_COMPANY_ALIASES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS company_aliases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alias_id TEXT NOT NULL UNIQUE,
    global_company_id TEXT NOT NULL,
    alias TEXT NOT NULL,
    alias_type TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the evidence table (previews only)
pub const CREATE_EVIDENCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS evidence (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    evidence_id TEXT NOT NULL UNIQUE,
    global_company_id TEXT NOT NULL,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    preview TEXT NOT NULL CHECK (length(preview) <= 500),
    source_url TEXT,
    source_name TEXT,
    relevance_score REAL,
    created_at TEXT NOT NULL,
    extracted_at TEXT
)
"#;

/// SQL to create the drift_alerts table
pub const CREATE_DRIFT_ALERTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS drift_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id TEXT NOT NULL UNIQUE,
    global_company_id TEXT NOT NULL,
    metric TEXT NOT NULL,
    old_value REAL NOT NULL,
    new_value REAL NOT NULL,
    drift_percentage REAL NOT NULL,
    detected_at TEXT NOT NULL,
    run_id TEXT NOT NULL,
    seen_at TEXT
)
"#;

/// SQL to create the scoring_runs table
pub const CREATE_SCORING_RUNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS scoring_runs (
    run_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    companies_scored INTEGER NOT NULL,
    avg_confidence REAL NOT NULL,
    norm_context_version TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT
)
"#;

/// SQL to create the service_stats table
pub const CREATE_SERVICE_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS service_stats (
    stat_name TEXT PRIMARY KEY,
    stat_value REAL NOT NULL,
    unit TEXT,
    measured_at TEXT NOT NULL
)
"#;

/// SQL to create the facet_buckets table
/// Rebuilt wholesale after every companies pass
pub const CREATE_FACET_BUCKETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS facet_buckets (
    facet_type TEXT NOT NULL,
    bucket_value TEXT NOT NULL,
    count INTEGER NOT NULL,
    dataset_version TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (facet_type, bucket_value)
)
"#;

/// SQL to create the sync_state table
pub const CREATE_SYNC_STATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sync_state (
    resource_type TEXT PRIMARY KEY,
    last_sync_at TEXT,
    last_etag TEXT,
    last_cursor TEXT,
    sync_status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT,
    records_synced INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the workspace_bookmarks table
pub const CREATE_WORKSPACE_BOOKMARKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS workspace_bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    org_id TEXT,
    global_company_id TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, global_company_id)
)
"#;

/// SQL to create the workspace_comparisons table
pub const CREATE_WORKSPACE_COMPARISONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS workspace_comparisons (
    comparison_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    org_id TEXT,
    name TEXT NOT NULL,
    company_ids TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the workspace_notes table
pub const CREATE_WORKSPACE_NOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS workspace_notes (
    note_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    org_id TEXT,
    global_company_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the search_history table
pub const CREATE_SEARCH_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS search_history (
    search_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    org_id TEXT,
    query TEXT NOT NULL,
    filters TEXT,
    result_count INTEGER NOT NULL,
    executed_at TEXT NOT NULL
)
"#;

/// Full-text indexes over company names/domains and aliases.
/// Row ids mirror the `id` of the source row.
pub const CREATE_FTS_TABLES: &[&str] = &[
    "CREATE VIRTUAL TABLE IF NOT EXISTS companies_fts USING fts5(name, domain)",
    "CREATE VIRTUAL TABLE IF NOT EXISTS aliases_fts USING fts5(alias)",
];

/// Triggers keeping the FTS tables in step with their source rows
pub const CREATE_FTS_TRIGGERS: &[&str] = &[
    r#"
    CREATE TRIGGER IF NOT EXISTS companies_fts_insert AFTER INSERT ON companies BEGIN
        INSERT INTO companies_fts (rowid, name, domain) VALUES (new.id, new.name, COALESCE(new.domain, ''));
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS companies_fts_update AFTER UPDATE OF name, domain ON companies BEGIN
        DELETE FROM companies_fts WHERE rowid = old.id;
        INSERT INTO companies_fts (rowid, name, domain) VALUES (new.id, new.name, COALESCE(new.domain, ''));
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS companies_fts_delete AFTER DELETE ON companies BEGIN
        DELETE FROM companies_fts WHERE rowid = old.id;
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS aliases_fts_insert AFTER INSERT ON company_aliases BEGIN
        INSERT INTO aliases_fts (rowid, alias) VALUES (new.id, new.alias);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS aliases_fts_update AFTER UPDATE OF alias ON company_aliases BEGIN
        DELETE FROM aliases_fts WHERE rowid = old.id;
        INSERT INTO aliases_fts (rowid, alias) VALUES (new.id, new.alias);
    END
    "#,
    r#"
    CREATE TRIGGER IF NOT EXISTS aliases_fts_delete AFTER DELETE ON company_aliases BEGIN
        DELETE FROM aliases_fts WHERE rowid = old.id;
    END
    "#,
];

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_companies_region ON companies(region)",
    "CREATE INDEX IF NOT EXISTS idx_companies_industry ON companies(industry)",
    "CREATE INDEX IF NOT EXISTS idx_companies_final_score ON companies(final_score)",
    "CREATE INDEX IF NOT EXISTS idx_companies_synced_at ON companies(synced_at)",
    "CREATE INDEX IF NOT EXISTS idx_aliases_company ON company_aliases(global_company_id)",
    "CREATE INDEX IF NOT EXISTS idx_evidence_company ON evidence(global_company_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_drift_company ON drift_alerts(global_company_id, detected_at)",
    "CREATE INDEX IF NOT EXISTS idx_notes_owner ON workspace_notes(user_id, global_company_id)",
    "CREATE INDEX IF NOT EXISTS idx_search_history_user ON search_history(user_id, executed_at)",
];

/// A versioned schema change recorded in `schema_migrations`
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: Vec<&'static str>,
}

/// All schema creation statements for the initial version
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_COMPANIES_TABLE,
        CREATE_COMPANY_ALIASES_TABLE,
        CREATE_EVIDENCE_TABLE,
        CREATE_DRIFT_ALERTS_TABLE,
        CREATE_SCORING_RUNS_TABLE,
        CREATE_SERVICE_STATS_TABLE,
        CREATE_FACET_BUCKETS_TABLE,
        CREATE_SYNC_STATE_TABLE,
        CREATE_WORKSPACE_BOOKMARKS_TABLE,
        CREATE_WORKSPACE_COMPARISONS_TABLE,
        CREATE_WORKSPACE_NOTES_TABLE,
        CREATE_SEARCH_HISTORY_TABLE,
    ];
    stmts.extend(CREATE_FTS_TABLES.iter().copied());
    stmts.extend(CREATE_FTS_TRIGGERS.iter().copied());
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Ordered migration list; append new versions at the end
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        name: "initial_schema",
        statements: all_schema_statements(),
    }]
}
