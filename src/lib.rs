//! Swipe News - An RSS News Aggregation Web App
//!
//! This crate aggregates configured RSS/Atom feeds into one merged,
//! date-sorted list served as JSON, with a card-based swipe UI on top.

pub mod aggregator;
pub mod config;
pub mod routes;
