use rusqlite::Connection;

use crate::error::PlayerDbError;

pub fn create_tables(conn: &Connection) -> Result<(), PlayerDbError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS players (
            name       TEXT PRIMARY KEY NOT NULL,
            record     BLOB NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}
