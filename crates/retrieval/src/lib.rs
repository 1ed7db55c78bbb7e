//! `dg-retrieval` — RAG context assembly and response synthesis.
//!
//! The query path mirrors the ingestion path's degrade-and-continue
//! policy: every retrieval source is optional, gap analysis is pure and
//! always runs, and a synthesis failure yields a fixed apology rather
//! than an error.

pub mod assembler;
pub mod gaps;
pub mod knowledge;
pub mod similarity;
pub mod synthesize;

pub use assembler::{
    AssemblyReport, AssemblyRequest, ContextAssembler, GroundingContext, RetrievedTranscript,
};
pub use synthesize::{ResponseSynthesizer, APOLOGY};
