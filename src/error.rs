use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("song file contains no records")]
    EmptySongFile,

    #[error("timestamp {0} ms is out of range")]
    TimestampOutOfRange(i64),
}
