//! HTTP server for the tournament structure engine.
//!
//! Exposes heat generation, round-robin groups, elimination brackets, and
//! set scoring over a JSON API backed by PostgreSQL.

pub mod api;
pub mod config;
pub mod logging;
