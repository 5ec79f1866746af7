//! # Tourney
//!
//! Tournament structure generation and match-progression engine for club and
//! federation sports events.
//!
//! The engine partitions event registrations into heats, round-robin groups,
//! or single-elimination brackets, schedules matches deterministically, and
//! advances match/set state through a majority-win scoring state machine that
//! cascades completion upward (set → match → group → event).
//!
//! ## Architecture
//!
//! - [`scheduling`]: pure structure builders (circle-method round robin,
//!   bracket sizing and seeding, heat partitioning)
//! - [`scoring`]: the match state machine (set ordering, result validation,
//!   majority detection)
//! - [`engine`]: the [`engine::TournamentEngine`] orchestrator tying the
//!   builders and the state machine to persistence
//! - [`store`]: the [`store::TournamentStore`] persistence interface with a
//!   PostgreSQL implementation and an in-memory fake for tests
//!
//! Everything outside structure generation and match progression —
//! authentication, authorization, form validation, notifications — is an
//! external collaborator and lives outside this crate.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tourney::engine::{HeatOptions, TournamentEngine};
//! use tourney::models::EventFormat;
//! use tourney::store::MemoryStore;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let event = store.seed_event(EventFormat::Heats, 3, Some(4));
//! for i in 0..9 {
//!     store.seed_registration(event.id, &format!("player {i}"));
//! }
//!
//! let engine = TournamentEngine::new(store);
//! let summary = engine.generate_heats(event.id, HeatOptions::default()).await?;
//! assert_eq!(summary.total_heats, 3);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod models;
pub mod scheduling;
pub mod scoring;
pub mod store;

pub use engine::TournamentEngine;
pub use error::{EngineError, EngineResult};
