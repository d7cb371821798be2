pub mod reader;
pub mod scanner;
