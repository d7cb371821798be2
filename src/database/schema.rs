pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS songplays (
        songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time TEXT NOT NULL,
        user_id TEXT NOT NULL,
        level TEXT,
        song_id TEXT,
        artist_id TEXT,
        session_id TEXT,
        location TEXT,
        user_agent TEXT
    );

    CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        first_name TEXT,
        last_name TEXT,
        gender TEXT,
        level TEXT,
        level_ts INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS songs (
        song_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        artist_id TEXT NOT NULL,
        year INTEGER NOT NULL DEFAULT 0,
        duration REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS artists (
        artist_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT,
        latitude REAL,
        longitude REAL
    );

    CREATE TABLE IF NOT EXISTS time (
        start_time TEXT PRIMARY KEY,
        hour INTEGER NOT NULL,
        day INTEGER NOT NULL,
        week INTEGER NOT NULL,
        month INTEGER NOT NULL,
        year INTEGER NOT NULL,
        weekday INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS songs_title_idx ON songs(title);
    CREATE INDEX IF NOT EXISTS artists_name_idx ON artists(name);
";

pub const DROP_SCHEMA: &str = "
    DROP TABLE IF EXISTS songplays;
    DROP TABLE IF EXISTS users;
    DROP TABLE IF EXISTS songs;
    DROP TABLE IF EXISTS artists;
    DROP TABLE IF EXISTS time;
";

/// Every table the loader writes to, fact table first.
pub const TABLES: &[&str] = &["songplays", "users", "songs", "artists", "time"];

/// Parameterized statements used by the extractors.
///
/// Placeholders are positional (`?1`, `?2`, ...) and documented per field.
#[derive(Debug, Clone, Copy)]
pub struct Statements {
    /// song_id, title, artist_id, year, duration
    pub song_insert: &'static str,
    /// artist_id, name, location, latitude, longitude
    pub artist_insert: &'static str,
    /// start_time, hour, day, week, month, year, weekday
    pub time_insert: &'static str,
    /// user_id, first_name, last_name, gender, level, level_ts
    pub user_insert: &'static str,
    /// start_time, user_id, level, song_id, artist_id, session_id, location, user_agent
    pub songplay_insert: &'static str,
    /// title, artist name, duration, tolerance -> (song_id, artist_id)
    pub song_select: &'static str,
}

pub fn statements() -> Statements {
    Statements {
        song_insert: "INSERT INTO songs (song_id, title, artist_id, year, duration)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(song_id) DO NOTHING",
        artist_insert: "INSERT INTO artists (artist_id, name, location, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(artist_id) DO NOTHING",
        time_insert: "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(start_time) DO NOTHING",
        // Older events never overwrite a newer level.
        user_insert: "INSERT INTO users (user_id, first_name, last_name, gender, level, level_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET level = excluded.level, level_ts = excluded.level_ts
             WHERE excluded.level_ts >= users.level_ts",
        songplay_insert: "INSERT INTO songplays
             (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        song_select: "SELECT songs.song_id, artists.artist_id
             FROM songs JOIN artists ON songs.artist_id = artists.artist_id
             WHERE songs.title = ?1 AND artists.name = ?2
               AND ABS(songs.duration - ?3) <= ?4
             ORDER BY ABS(songs.duration - ?3), songs.song_id
             LIMIT 1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let mut expected: Vec<String> = TABLES.iter().map(|t| t.to_string()).collect();
        expected.sort();
        assert_eq!(table_names(&conn), expected);
    }

    #[test]
    fn test_drop_schema_removes_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(DROP_SCHEMA).unwrap();
        assert!(table_names(&conn).is_empty());
    }

    #[test]
    fn test_statements_prepare_against_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        let s = statements();
        for sql in [
            s.song_insert,
            s.artist_insert,
            s.time_insert,
            s.user_insert,
            s.songplay_insert,
            s.song_select,
        ] {
            conn.prepare(sql).unwrap();
        }
    }
}
