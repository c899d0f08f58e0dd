//! Port traits: the seams where `arcline-core`'s pure engine logic meets
//! external systems. Each has exactly one production adapter (in
//! `arcline-postgres` / `arcline-neo4j` / `arcline-llm`) and, for tests, an
//! in-memory fake (see `arcline-core/tests/`).
//!
//! Resolves the Design Notes "Singleton via module-level variable" item:
//! stage drivers receive `Arc<dyn Trait>` constructed once by the binary
//! entry point, never a lazily-initialized global.

pub mod graph;
pub mod llm;
pub mod store;

pub use graph::{EntityCentrality, GraphIndex, Neighborhood, RawPair, StrategicNeighbor};
pub use llm::{ChatMessage, CompletionOptions, JsonCompletion, LlmClient, Role};
pub use store::{
    CentroidStore, ConnectivityStore, CtmStore, EpicStore, EventFamilyStore, NarrativeStore,
    SortOrder, TitleStore,
};
