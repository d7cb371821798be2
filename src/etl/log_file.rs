use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use crate::database::repo::{self, SongPlayRow, UserRow};
use crate::database::schema::Statements;
use crate::etl::calendar::CalendarParts;
use crate::ingest::reader::{read_records, LogRecord};

/// How play events are matched against the song and artist tables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LookupOptions {
    /// Largest accepted difference, in seconds, between the event length and
    /// the stored song duration. Zero means an exact match.
    pub duration_tolerance: f64,
}

/// What a log file contributed, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogFileSummary {
    pub records: usize,
    pub song_plays: usize,
    pub matched: usize,
}

impl LogRecord {
    pub fn user_row(&self) -> UserRow {
        UserRow {
            user_id: self.user_id.clone().unwrap_or_default(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level.clone(),
            level_ts: self.ts,
        }
    }
}

/// Loads the time, user and songplay rows for every `NextSong` event in a
/// log file.
pub fn process_log_file(
    conn: &Connection,
    stmts: &Statements,
    path: &Path,
    options: LookupOptions,
) -> Result<LogFileSummary> {
    let records: Vec<LogRecord> = read_records(path)?;
    let total = records.len();
    let plays: Vec<LogRecord> = records.into_iter().filter(LogRecord::is_song_play).collect();

    let times = plays
        .iter()
        .map(|r| CalendarParts::from_epoch_millis(r.ts))
        .collect::<Result<Vec<_>, _>>()?;

    for parts in &times {
        repo::insert_time(conn, stmts, &parts.to_row())?;
    }

    // Events without a user id still become songplays, but get no users row.
    let known_users = plays
        .iter()
        .filter(|r| r.user_id.as_deref().is_some_and(|id| !id.is_empty()));
    for record in known_users {
        repo::upsert_user(conn, stmts, &record.user_row())?;
    }

    let mut matched = 0;
    for (record, parts) in plays.iter().zip(&times) {
        let found = match (&record.song, &record.artist, record.length) {
            (Some(song), Some(artist), Some(length)) => repo::find_song(
                conn,
                stmts,
                song,
                artist,
                length,
                options.duration_tolerance,
            )?,
            _ => None,
        };
        if found.is_some() {
            matched += 1;
        }
        let (song_id, artist_id) = found.unzip();

        repo::insert_songplay(
            conn,
            stmts,
            &SongPlayRow {
                start_time: parts.start_time(),
                user_id: record.user_id.clone().unwrap_or_default(),
                level: record.level.clone(),
                song_id,
                artist_id,
                session_id: record.session_id.clone().unwrap_or_default(),
                location: record.location.clone(),
                user_agent: record.user_agent.clone(),
            },
        )?;
    }

    let summary = LogFileSummary {
        records: total,
        song_plays: plays.len(),
        matched,
    };
    debug!("{:?}: {:?}", path, summary);
    Ok(summary)
}
