use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};

use crate::database::repo::TimeRow;
use crate::error::RecordError;

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Calendar breakdown of an event timestamp, in UTC.
///
/// `week` is the ISO-8601 week number and `weekday` counts from Monday = 0
/// to Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    pub datetime: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl CalendarParts {
    pub fn from_epoch_millis(ts: i64) -> Result<Self, RecordError> {
        let datetime = DateTime::from_timestamp_millis(ts)
            .ok_or(RecordError::TimestampOutOfRange(ts))?
            .naive_utc();

        Ok(Self {
            datetime,
            hour: datetime.hour(),
            day: datetime.day(),
            week: datetime.iso_week().week(),
            month: datetime.month(),
            year: datetime.year(),
            weekday: datetime.weekday().num_days_from_monday(),
        })
    }

    /// Text form stored in `start_time` columns.
    pub fn start_time(&self) -> String {
        self.datetime.format(START_TIME_FORMAT).to_string()
    }

    pub fn to_row(&self) -> TimeRow {
        TimeRow {
            start_time: self.start_time(),
            hour: self.hour,
            day: self.day,
            week: self.week,
            month: self.month,
            year: self.year,
            weekday: self.weekday,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_timestamp() {
        let parts = CalendarParts::from_epoch_millis(1541121934796).unwrap();
        assert_eq!(parts.start_time(), "2018-11-02 01:25:34.796");
        assert_eq!(parts.hour, 1);
        assert_eq!(parts.day, 2);
        assert_eq!(parts.week, 44);
        assert_eq!(parts.month, 11);
        assert_eq!(parts.year, 2018);
        // Friday
        assert_eq!(parts.weekday, 4);
    }

    #[test]
    fn test_iso_week_crosses_year_boundary() {
        // 2018-12-31 is a Monday in ISO week 1 of 2019.
        let parts = CalendarParts::from_epoch_millis(1546214400000).unwrap();
        assert_eq!((parts.year, parts.month, parts.day), (2018, 12, 31));
        assert_eq!(parts.week, 1);
        assert_eq!(parts.weekday, 0);
    }

    #[test]
    fn test_epoch_zero() {
        let row = CalendarParts::from_epoch_millis(0).unwrap().to_row();
        assert_eq!(row.start_time, "1970-01-01 00:00:00.000");
        assert_eq!(row.weekday, 3);
        assert_eq!(row.week, 1);
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            CalendarParts::from_epoch_millis(i64::MAX),
            Err(RecordError::TimestampOutOfRange(_))
        ));
    }
}
