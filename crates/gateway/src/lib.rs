//! `dg-gateway` — the DreamGate HTTP server and CLI.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod dedupe;
pub mod state;
