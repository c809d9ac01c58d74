pub mod books;
pub mod config;
pub mod contest;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod storage;
pub mod telemetry;
pub mod wikisource;
