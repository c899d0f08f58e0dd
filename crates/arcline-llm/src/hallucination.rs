//! Post-edit hallucination fix: the LLM sometimes writes a source
//! office-holder's name with a stale or purely descriptive title instead
//! of the one implied by the surrounding Title text. A small set of known
//! substitutions catches the recurring cases; this is not a general
//! coreference fix.

use std::sync::LazyLock;

use regex::Regex;

static TRUMP_FORMER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bformer\s+president\s+trump\b").expect("valid regex"));

static MERZ_OPPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bopposition\s+leader\s+merz\b").expect("valid regex")
});

/// Apply the fixed substitutions. Idempotent and order-independent: the
/// two patterns never overlap.
pub fn fix(text: &str) -> String {
    let text = TRUMP_FORMER.replace_all(text, "President Trump");
    let text = MERZ_OPPOSITION.replace_all(&text, "Chancellor Merz");
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_former_president_trump() {
        let out = fix("Former President Trump announced new tariffs today.");
        assert_eq!(out, "President Trump announced new tariffs today.");
    }

    #[test]
    fn fixes_opposition_leader_merz_case_insensitive() {
        let out = fix("Opposition Leader Merz met with EU officials.");
        assert_eq!(out, "Chancellor Merz met with EU officials.");
    }

    #[test]
    fn leaves_unrelated_text_untouched() {
        let out = fix("President Biden signed the executive order.");
        assert_eq!(out, "President Biden signed the executive order.");
    }

    #[test]
    fn fixes_multiple_occurrences() {
        let out = fix("Former President Trump spoke. Later, former President Trump left.");
        assert_eq!(out, "President Trump spoke. Later, President Trump left.");
    }
}
