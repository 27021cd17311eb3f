//! Database schema definitions
//!
//! This module contains the SQL schema for the Job-Sieve state database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per normalized URL
CREATE TABLE IF NOT EXISTS url_state (
    normalized_url TEXT PRIMARY KEY,
    final_url TEXT,
    canonical_url TEXT,
    etag TEXT,
    last_modified TEXT,
    last_fetch TEXT,
    status TEXT,
    http_status INTEGER,
    content_type TEXT,
    rejected_reason TEXT,
    blocked_reason TEXT,
    classification_type TEXT,
    classification_confidence REAL
);

CREATE INDEX IF NOT EXISTS idx_url_state_status ON url_state(status);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_initializes() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_url_state_columns() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let mut stmt = conn.prepare("PRAGMA table_info(url_state)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(columns.len(), 13);
        assert_eq!(columns[0], "normalized_url");
        assert!(columns.contains(&"classification_confidence".to_string()));
    }
}
