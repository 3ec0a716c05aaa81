//! SQL schema definitions.

/// Base schema: works, splits, passes and play records.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Works & ownership splits
-- ============================================================

CREATE TABLE IF NOT EXISTS works (
    work_id TEXT PRIMARY KEY,
    uploader TEXT NOT NULL,
    title TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('loop', 'song', 'pack')),
    is_draft INTEGER NOT NULL DEFAULT 1,
    -- JSON SplitModel; payees are tagged objects
    splits TEXT NOT NULL DEFAULT '{"composition":[],"production":[]}',
    remixer_stake_pct INTEGER CHECK (remixer_stake_pct BETWEEN 0 AND 100),
    splits_version INTEGER NOT NULL DEFAULT 0,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_works_uploader ON works(uploader);

CREATE TABLE IF NOT EXISTS work_sources (
    work_id TEXT NOT NULL REFERENCES works(work_id) ON DELETE CASCADE,
    source_work_id TEXT NOT NULL REFERENCES works(work_id),
    position INTEGER NOT NULL,
    PRIMARY KEY (work_id, source_work_id)
);

CREATE INDEX IF NOT EXISTS idx_work_sources_source ON work_sources(source_work_id);

-- ============================================================
-- Passes & metered plays
-- ============================================================

CREATE TABLE IF NOT EXISTS passes (
    pass_id TEXT PRIMARY KEY,
    payer TEXT NOT NULL,
    tx_reference TEXT,
    purchased_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'expired', 'distributed'))
);

CREATE INDEX IF NOT EXISTS idx_passes_status ON passes(status, expires_at);

CREATE TABLE IF NOT EXISTS play_records (
    play_id TEXT PRIMARY KEY,
    pass_id TEXT NOT NULL REFERENCES passes(pass_id),
    work_id TEXT NOT NULL REFERENCES works(work_id),
    category TEXT NOT NULL,
    credits INTEGER NOT NULL,
    duration_seconds INTEGER,
    played_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_plays_pass ON play_records(pass_id);

CREATE TRIGGER IF NOT EXISTS play_records_immutable
BEFORE UPDATE ON play_records
BEGIN
    SELECT RAISE(ABORT, 'play records are immutable');
END;
"#;

/// v2: separate non-revenue stream for preview samples.
pub const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS preview_plays (
    preview_id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_id TEXT NOT NULL,
    listener TEXT,
    duration_seconds INTEGER,
    played_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_previews_work ON preview_plays(work_id);
"#;
