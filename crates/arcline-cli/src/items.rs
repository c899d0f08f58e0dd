//! Newtype wrappers implementing [`arcline_core::runner::RunnableItem`]
//! for the stage runner. Defined here rather than on the domain types
//! directly: `Title`/`EventFamily` and `RunnableItem` both live in
//! `arcline-core`, so only that crate (or a local wrapper type, the
//! standard orphan-rule workaround) can provide the impl.

use arcline_core::domain::{EventFamily, Title};
use arcline_core::runner::RunnableItem;

#[derive(Clone)]
pub struct FilterItem(pub Title);

impl RunnableItem for FilterItem {
    fn item_id(&self) -> String {
        self.0.id.to_string()
    }
}

/// One batch of titles handed to [`arcline_core::assembler::EventFamilyAssembler::assemble_batch`]
/// as a single runner item — P3 groups titles, it doesn't process them
/// one at a time.
#[derive(Clone)]
pub struct TitleBatch(pub Vec<Title>);

impl RunnableItem for TitleBatch {
    fn item_id(&self) -> String {
        self.0
            .iter()
            .map(|t| t.id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Clone)]
pub struct EnrichItem(pub EventFamily);

impl RunnableItem for EnrichItem {
    fn item_id(&self) -> String {
        self.0.id.to_string()
    }
}
