use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::RecordError;

/// One line of a song metadata file.
#[derive(Debug, Clone, Deserialize)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    #[serde(default)]
    pub year: i64,
    pub duration: f64,
    pub artist_name: String,
    #[serde(default)]
    pub artist_location: Option<String>,
    #[serde(default)]
    pub artist_latitude: Option<f64>,
    #[serde(default)]
    pub artist_longitude: Option<f64>,
}

/// One line of an application event log.
///
/// Only `ts` and `page` are mandatory; logged-out events carry nulls or empty
/// strings for the user fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub ts: i64,
    pub page: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl LogRecord {
    pub fn is_song_play(&self) -> bool {
        self.page == "NextSong"
    }
}

/// Accepts `"39"`, `39` or `null` and renders the value as text.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

/// Reads every non-blank line of a newline-delimited JSON file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| RecordError::Parse { line: idx + 1, source })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SONG_LINE: &str = r#"{"num_songs": 1, "artist_id": "ARD7TVE1187B99BFB1", "artist_latitude": null, "artist_longitude": null, "artist_location": "California - LA", "artist_name": "Casual", "song_id": "SOMZWCG12A8C13C480", "title": "I Didn't Mean To", "duration": 218.93179, "year": 0}"#;

    const LOG_LINE: &str = r#"{"artist":"Pavement","auth":"Logged In","firstName":"Sylvie","gender":"F","itemInSession":0,"lastName":"Cruz","length":99.16036,"level":"free","location":"Washington-Arlington-Alexandria, DC-VA-MD-WV","method":"PUT","page":"NextSong","registration":1540266185796.0,"sessionId":345,"song":"Mercy:The Laundromat","status":200,"ts":1541990258796,"userAgent":"Mozilla/5.0","userId":"10"}"#;

    #[test]
    fn test_read_song_record() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("song.json");
        fs::write(&path, SONG_LINE)?;

        let records: Vec<SongRecord> = read_records(&path)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].song_id, "SOMZWCG12A8C13C480");
        assert_eq!(records[0].artist_latitude, None);
        assert_eq!(records[0].artist_location.as_deref(), Some("California - LA"));
        Ok(())
    }

    #[test]
    fn test_log_ids_are_rendered_as_text() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("events.json");
        let logged_out = r#"{"auth":"Logged Out","page":"Home","ts":1541990217796,"userId":"","sessionId":345,"song":null,"artist":null,"length":null}"#;
        fs::write(&path, format!("{}\n\n{}\n", LOG_LINE, logged_out))?;

        let records: Vec<LogRecord> = read_records(&path)?;
        assert_eq!(records.len(), 2);
        assert!(records[0].is_song_play());
        assert_eq!(records[0].user_id.as_deref(), Some("10"));
        assert_eq!(records[0].session_id.as_deref(), Some("345"));
        assert!(!records[1].is_song_play());
        assert_eq!(records[1].song, None);
        Ok(())
    }

    #[test]
    fn test_numeric_user_id() {
        let record: LogRecord =
            serde_json::from_str(r#"{"ts":1,"page":"NextSong","userId":26,"sessionId":"7"}"#).unwrap();
        assert_eq!(record.user_id.as_deref(), Some("26"));
        assert_eq!(record.session_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_malformed_line_reports_line_number() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("events.json");
        fs::write(&path, format!("{}\n{{not json\n", LOG_LINE))?;

        let err = read_records::<LogRecord>(&path).unwrap_err();
        match err.downcast_ref::<RecordError>() {
            Some(RecordError::Parse { line, .. }) => assert_eq!(*line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_missing_required_song_field_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("song.json");
        fs::write(&path, r#"{"song_id": "S1", "title": "x"}"#)?;
        assert!(read_records::<SongRecord>(&path).is_err());
        Ok(())
    }
}
