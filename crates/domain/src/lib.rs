//! `dg-domain` — shared types for all DreamGate crates.
//!
//! Holds the entity model (conversation records, extracted facts, user
//! profiles, gap reports), the configuration tree, the shared error enum,
//! and the structured trace events. No I/O lives here.

pub mod config;
pub mod error;
pub mod record;
pub mod trace;
