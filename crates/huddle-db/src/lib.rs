//! Persistence layer for huddle: connection pool, embedded migrations,
//! row types, and per-table query functions.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
