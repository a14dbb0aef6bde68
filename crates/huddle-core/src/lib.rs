//! Core logic for huddle: the social scope resolver, the plan discovery
//! query composer, and the auth helpers around them.

pub mod auth;
pub mod discover;
pub mod scope;
