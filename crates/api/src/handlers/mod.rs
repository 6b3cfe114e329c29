//! HTTP handlers, grouped by resource.

pub mod admin;
pub mod health;
pub mod jobs;
pub mod users;
