use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use crate::database::repo::{self, ArtistRow, SongRow};
use crate::database::schema::Statements;
use crate::error::RecordError;
use crate::ingest::reader::{read_records, SongRecord};

impl SongRecord {
    pub fn song_row(&self) -> SongRow {
        SongRow {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    pub fn artist_row(&self) -> ArtistRow {
        ArtistRow {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// Loads the song and artist described by a single song metadata file.
pub fn process_song_file(conn: &Connection, stmts: &Statements, path: &Path) -> Result<()> {
    let records: Vec<SongRecord> = read_records(path)?;
    let record = records.first().ok_or(RecordError::EmptySongFile)?;
    if records.len() > 1 {
        warn!("{:?} holds {} records, only the first is loaded", path, records.len());
    }

    repo::insert_song(conn, stmts, &record.song_row())?;
    repo::insert_artist(conn, stmts, &record.artist_row())?;
    Ok(())
}
