//! Per-table query functions.

pub mod friends;
pub mod plans;
pub mod sessions;
pub mod users;
