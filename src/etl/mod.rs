pub mod calendar;
pub mod driver;
pub mod log_file;
pub mod song_file;
