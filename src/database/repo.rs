use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use crate::database::schema::{self, Statements, DROP_SCHEMA, SCHEMA, TABLES};

#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    /// Epoch milliseconds of the event carrying `level`.
    pub level_ts: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub start_time: String,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongPlayRow {
    pub start_time: String,
    pub user_id: String,
    pub level: Option<String>,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: String,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

pub fn insert_song(conn: &Connection, stmts: &Statements, row: &SongRow) -> Result<()> {
    conn.prepare_cached(stmts.song_insert)?
        .execute(params![row.song_id, row.title, row.artist_id, row.year, row.duration])
        .context("Failed to insert song")?;
    Ok(())
}

pub fn insert_artist(conn: &Connection, stmts: &Statements, row: &ArtistRow) -> Result<()> {
    conn.prepare_cached(stmts.artist_insert)?
        .execute(params![row.artist_id, row.name, row.location, row.latitude, row.longitude])
        .context("Failed to insert artist")?;
    Ok(())
}

pub fn insert_time(conn: &Connection, stmts: &Statements, row: &TimeRow) -> Result<()> {
    conn.prepare_cached(stmts.time_insert)?
        .execute(params![
            row.start_time,
            row.hour,
            row.day,
            row.week,
            row.month,
            row.year,
            row.weekday
        ])
        .context("Failed to insert time row")?;
    Ok(())
}

pub fn upsert_user(conn: &Connection, stmts: &Statements, row: &UserRow) -> Result<()> {
    conn.prepare_cached(stmts.user_insert)?
        .execute(params![
            row.user_id,
            row.first_name,
            row.last_name,
            row.gender,
            row.level,
            row.level_ts
        ])
        .context("Failed to upsert user")?;
    Ok(())
}

pub fn insert_songplay(conn: &Connection, stmts: &Statements, row: &SongPlayRow) -> Result<()> {
    conn.prepare_cached(stmts.songplay_insert)?
        .execute(params![
            row.start_time,
            row.user_id,
            row.level,
            row.song_id,
            row.artist_id,
            row.session_id,
            row.location,
            row.user_agent
        ])
        .context("Failed to insert songplay")?;
    Ok(())
}

/// Looks up the (song_id, artist_id) pair for a play event.
///
/// A `tolerance` of `0.0` requires the stored duration to equal `duration`
/// exactly.
pub fn find_song(
    conn: &Connection,
    stmts: &Statements,
    title: &str,
    artist: &str,
    duration: f64,
    tolerance: f64,
) -> Result<Option<(String, String)>> {
    let found: Option<(String, String)> = conn
        .prepare_cached(stmts.song_select)?
        .query_row(params![title, artist, duration, tolerance], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .optional()
        .context("Failed to look up song")?;
    Ok(found)
}

/// Owns the SQLite connection and hands out one transaction per unit of work.
pub struct TransactionManager {
    conn: Connection,
    statements: Statements,
}

impl TransactionManager {
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {:?}", path))?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("Failed to initialize schema")?;
        Ok(Self {
            conn,
            statements: schema::statements(),
        })
    }

    /// Drops every table and recreates the schema from scratch.
    pub fn reset(&mut self) -> Result<()> {
        info!("Dropping and recreating all tables");
        self.conn
            .execute_batch(DROP_SCHEMA)
            .context("Failed to drop tables")?;
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to initialize schema")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `work` inside a single transaction and commits if it succeeds.
    ///
    /// An error from `work` drops the transaction, which rolls back every
    /// statement issued inside it.
    pub fn in_transaction<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>, &Statements) -> Result<T>,
    {
        let tx = self.conn.transaction().context("Failed to begin transaction")?;
        let out = work(&tx, &self.statements)?;
        tx.commit().context("Failed to commit transaction")?;
        debug!("Transaction committed");
        Ok(out)
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        // Table names come from the fixed schema list, never from input.
        anyhow::ensure!(TABLES.contains(&table), "Unknown table {}", table);
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(count)
    }

    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for &table in TABLES {
            counts.push((table, self.count_rows(table)?));
        }
        Ok(counts)
    }
}
