use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS blobs (
    blake3_hash TEXT PRIMARY KEY NOT NULL,    -- hex content hash, also the file name
    owner_id    TEXT NOT NULL,
    file_size   INTEGER NOT NULL,
    local_path  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
