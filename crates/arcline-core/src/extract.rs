//! On-demand narrative extraction: request/response shapes and pure
//! validation for the `POST /extract` interface.
//!
//! The HTTP surface itself is out of scope here — the administrative
//! service is treated as an external collaborator. This module exists so
//! an external binary can mount that interface without re-deriving its
//! input contract: it owns the request/response types and the boundary
//! checks (member-title floor, CTM title floor) that must hold before
//! [`crate::narrative_extractor::NarrativeExtractor::extract`] is ever
//! called, keeping wire-adjacent validation in the core crate and leaving
//! the transport to a thin adapter.

use serde::{Deserialize, Serialize};

use crate::domain::{NarrativeEntityType, NarrativeFrame};

/// Minimum member titles an Event Family must have before it is eligible
/// for on-demand extraction (spec §8 boundary behavior).
pub const MIN_EF_TITLES_FOR_EXTRACTION: usize = 5;

/// Default minimum titles a CTM must have before it is eligible
/// (spec §8; configurable per the same section, default 20).
pub const DEFAULT_MIN_CTM_TITLES_FOR_EXTRACTION: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    pub entity_type: NarrativeEntityType,
    pub entity_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub frames: Vec<NarrativeFrame>,
}

/// Why an [`ExtractRequest`] was rejected before reaching the extractor.
/// Each variant maps to the 4xx the HTTP adapter should return (spec §7:
/// "4xx on input errors... 5xx only for truly unexpected internal
/// failure").
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractValidationError {
    #[error("entity {entity_id} not found")]
    EntityNotFound { entity_id: String },
    #[error("epics are not eligible for on-demand extraction")]
    EntityTypeNotEligible,
    #[error("event family {entity_id} has {actual} member titles, below the minimum of {minimum}")]
    TooFewMemberTitles {
        entity_id: String,
        actual: usize,
        minimum: usize,
    },
}

/// Validate a request against the caller-supplied title count for the
/// named entity, before any extraction work begins.
///
/// `title_count` is `None` when the entity id does not resolve at all.
/// `ctm_minimum` lets callers plug in the configurable CTM floor (spec §8
/// default 20); EFs always use [`MIN_EF_TITLES_FOR_EXTRACTION`].
pub fn validate_extract_request(
    request: &ExtractRequest,
    title_count: Option<usize>,
    ctm_minimum: usize,
) -> Result<(), ExtractValidationError> {
    if matches!(request.entity_type, NarrativeEntityType::Epic) {
        return Err(ExtractValidationError::EntityTypeNotEligible);
    }

    let Some(count) = title_count else {
        return Err(ExtractValidationError::EntityNotFound {
            entity_id: request.entity_id.clone(),
        });
    };

    let minimum = match request.entity_type {
        NarrativeEntityType::Event => MIN_EF_TITLES_FOR_EXTRACTION,
        NarrativeEntityType::Ctm => ctm_minimum,
        NarrativeEntityType::Epic => unreachable!("rejected above"),
    };

    if count < minimum {
        return Err(ExtractValidationError::TooFewMemberTitles {
            entity_id: request.entity_id.clone(),
            actual: count,
            minimum,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(entity_type: NarrativeEntityType) -> ExtractRequest {
        ExtractRequest {
            entity_type,
            entity_id: "e1".into(),
        }
    }

    #[test]
    fn epic_is_never_eligible() {
        let req = request(NarrativeEntityType::Epic);
        let err = validate_extract_request(&req, Some(100), 20).unwrap_err();
        assert_eq!(err, ExtractValidationError::EntityTypeNotEligible);
    }

    #[test]
    fn missing_entity_is_not_found() {
        let req = request(NarrativeEntityType::Event);
        let err = validate_extract_request(&req, None, 20).unwrap_err();
        assert!(matches!(err, ExtractValidationError::EntityNotFound { .. }));
    }

    #[test]
    fn ef_below_five_titles_is_rejected() {
        let req = request(NarrativeEntityType::Event);
        let err = validate_extract_request(&req, Some(4), 20).unwrap_err();
        assert!(matches!(
            err,
            ExtractValidationError::TooFewMemberTitles { actual: 4, minimum: 5, .. }
        ));
    }

    #[test]
    fn ctm_below_configured_minimum_is_rejected() {
        let req = request(NarrativeEntityType::Ctm);
        let err = validate_extract_request(&req, Some(19), 20).unwrap_err();
        assert!(matches!(
            err,
            ExtractValidationError::TooFewMemberTitles { actual: 19, minimum: 20, .. }
        ));
    }

    #[test]
    fn eligible_entities_pass() {
        assert!(validate_extract_request(&request(NarrativeEntityType::Event), Some(5), 20).is_ok());
        assert!(validate_extract_request(&request(NarrativeEntityType::Ctm), Some(20), 20).is_ok());
    }
}
