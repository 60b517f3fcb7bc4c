//! # ksql-ddl
//!
//! Compiles entity metadata and structured query models into the ksqlDB statements that
//! create per-second rows streams, windowed bar tables and rows-last tables.
//!
//! Everything here is pure: no connections, no I/O beyond optional settings loading. The
//! output text is stable across runs for identical input.

pub mod config;
pub mod framework;
pub mod infrastructure;
pub mod logger;
