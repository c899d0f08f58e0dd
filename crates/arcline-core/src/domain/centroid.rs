//! Centroid: a predeclared strategic storyline, immutable config (spec §3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Centroid {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
    pub actors: Vec<String>,
    pub theaters: Vec<String>,
}
