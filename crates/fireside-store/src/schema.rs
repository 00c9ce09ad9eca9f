//! Record store database schema.

/// SQL to create the records table.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS records (
    table_name  VARCHAR(64) NOT NULL,
    key         UUID NOT NULL,
    data        JSONB NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (table_name, key)
);

CREATE INDEX IF NOT EXISTS idx_records_session
    ON records ((data ->> 'session_id'));
";
