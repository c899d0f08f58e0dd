//! Domain model: the entities of spec §3, as plain typed Rust values.
//!
//! Nothing in this module performs I/O. Storage and graph adapters convert
//! between these types and their own wire/row representations.

pub mod centroid;
pub mod checkpoint;
pub mod connectivity;
pub mod ctm;
pub mod epic;
pub mod event_family;
pub mod narrative;
pub mod title;

pub use centroid::Centroid;
pub use checkpoint::Checkpoint;
pub use connectivity::{composite_score, ConnectivityRecord, COMPOSITE_FLOOR};
pub use ctm::{Ctm, CtmId};
pub use epic::{Epic, EpicCandidate, EpicId};
pub use event_family::{
    ActorRole, CanonicalActor, EfContext, EfStatus, EnrichmentPayload, EventFamily,
    EventFamilyId, Magnitude, PolicyStatus,
};
pub use narrative::{CountryShare, NarrativeEntityType, NarrativeFrame, SourceShare};
pub use title::{
    ActionTriple, EfAssignment, Entity, EntityType, ProcessingStatus, Title, TitleId, Verdict,
};
