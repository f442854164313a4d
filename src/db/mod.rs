//! SQLite storage for the current pomodoro slot and the history log.
//!
//! Every public method takes the connection lock once, so each call is
//! atomic on its own. Sequences of calls are serialized one level up by
//! [`Tracker`](crate::tracker::Tracker).

mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};

use crate::models::*;

const DATABASE_FILE: &str = "pomodoro.db";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open `pomodoro.db` inside a data directory.
    pub fn open_in(data_directory: &Path) -> Result<Self> {
        Self::open(data_directory.join(DATABASE_FILE))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Current slot
    // ============================================================

    pub fn get_current(&self) -> Result<Option<Pomodoro>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        read_current(&conn)
    }

    /// Put `pomodoro` in the slot, replacing whatever was there.
    pub fn set_current(&self, pomodoro: &Pomodoro) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO current_pomodoro (id, start_time, duration_secs, description, tags)
             VALUES (1, ?, ?, ?, ?)",
            (
                pomodoro.start_time.to_rfc3339(),
                pomodoro.duration.num_seconds(),
                &pomodoro.description,
                serde_json::to_string(&pomodoro.tags)?,
            ),
        )?;
        Ok(())
    }

    /// Empty the slot. Returns whether anything was removed.
    pub fn clear_current(&self) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM current_pomodoro", [])?;
        Ok(rows > 0)
    }

    /// Move the slot occupant to the end of history and empty the slot,
    /// in one transaction. Returns the archived pomodoro, if any.
    pub fn finish_current(&self) -> Result<Option<Pomodoro>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let Some(pomodoro) = read_current(&tx)? else {
            return Ok(None);
        };
        insert_history(&tx, &pomodoro)?;
        tx.execute("DELETE FROM current_pomodoro", [])?;
        tx.commit()?;

        Ok(Some(pomodoro))
    }

    // ============================================================
    // History
    // ============================================================

    pub fn append_history(&self, pomodoro: &Pomodoro) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        insert_history(&conn, pomodoro)
    }

    pub fn get_history(&self) -> Result<History> {
        let conn = self.conn.lock().expect("database lock poisoned");
        read_history(&conn)
    }

    pub fn latest_history(&self) -> Result<Option<Pomodoro>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let pomodoro = conn
            .query_row(
                "SELECT start_time, duration_secs, description, tags
                 FROM history ORDER BY id DESC LIMIT 1",
                [],
                row_to_pomodoro,
            )
            .optional()?;
        Ok(pomodoro)
    }

    /// Slot and history read under a single lock, so readers never observe
    /// half of a finish.
    pub fn snapshot(&self) -> Result<(Option<Pomodoro>, History)> {
        let conn = self.conn.lock().expect("database lock poisoned");
        Ok((read_current(&conn)?, read_history(&conn)?))
    }
}

fn read_current(conn: &Connection) -> Result<Option<Pomodoro>> {
    let pomodoro = conn
        .query_row(
            "SELECT start_time, duration_secs, description, tags
             FROM current_pomodoro WHERE id = 1",
            [],
            row_to_pomodoro,
        )
        .optional()?;
    Ok(pomodoro)
}

fn read_history(conn: &Connection) -> Result<History> {
    let mut stmt = conn.prepare(
        "SELECT start_time, duration_secs, description, tags
         FROM history ORDER BY id",
    )?;
    let pomodoros = stmt
        .query_map([], row_to_pomodoro)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(History::from(pomodoros))
}

fn insert_history(conn: &Connection, pomodoro: &Pomodoro) -> Result<()> {
    conn.execute(
        "INSERT INTO history (start_time, duration_secs, description, tags, recorded_at)
         VALUES (?, ?, ?, ?, ?)",
        (
            pomodoro.start_time.to_rfc3339(),
            pomodoro.duration.num_seconds(),
            &pomodoro.description,
            serde_json::to_string(&pomodoro.tags)?,
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(())
}

fn row_to_pomodoro(row: &Row<'_>) -> rusqlite::Result<Pomodoro> {
    let start_time = parse_datetime(0, row.get::<_, String>(0)?)?;
    let tags = parse_tags(3, row.get::<_, String>(3)?)?;
    Ok(Pomodoro {
        start_time,
        duration: Duration::seconds(row.get(1)?),
        description: row.get(2)?,
        tags,
    })
}

fn parse_datetime(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_tags(idx: usize, s: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
