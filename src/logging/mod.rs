//! Structured logging setup and direct JSON report output.

mod format;

pub use format::StructuredLogger;
