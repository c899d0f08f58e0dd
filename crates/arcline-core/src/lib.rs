//! Core domain model and engine logic for the Arcline strategic-filtering
//! and Event Family pipeline (spec §1-§5, §7-§9).
//!
//! This crate is the pure heart of the pipeline: domain types, port
//! traits (the seams to Postgres/Neo4j/the LLM service), and the engine
//! logic for every stage (C1-C10). It performs no I/O itself — adapter
//! crates (`arcline-postgres`, `arcline-neo4j`, `arcline-llm`) implement
//! the port traits in [`traits`], and `arcline-cli` wires concrete
//! adapters into the stage drivers at the process entry point.

pub mod assembler;
pub mod centroid_matcher;
pub mod checkpointing;
pub mod config;
pub mod connectivity_cache;
pub mod domain;
pub mod enrichment;
pub mod epic_assembler;
pub mod error;
pub mod extract;
pub mod filter;
pub mod narrative_extractor;
pub mod runner;
pub mod traits;

pub use error::{PipelineError, Result};
