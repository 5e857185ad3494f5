//! The approach tree: paths opposing counsel might take against a petition.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Fewest approaches a valid tree may hold.
pub const MIN_APPROACHES: usize = 5;
/// Most approaches a valid tree may hold.
pub const MAX_APPROACHES: usize = 100;

/// One node of the approach tree, with its two research questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approach {
    /// The approach, framed as a question or legal situation.
    pub title: String,
    /// Question for the precedent database.
    pub query_legal_database: String,
    /// Question for the statutes database.
    pub query_legal_acts: String,
}

/// The validated set of approaches derived from a petition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetitionApproaches {
    pub approaches: Vec<Approach>,
}

impl PetitionApproaches {
    /// Parse generator output, tolerating a surrounding Markdown code fence.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidApproaches`] if the text is not JSON of the
    /// expected shape or fails [`validate`](Self::validate).
    pub fn parse(raw: &str) -> Result<Self> {
        let json = strip_code_fence(raw);
        let parsed: Self = serde_json::from_str(json)
            .map_err(|e| RagError::InvalidApproaches(format!("malformed approaches JSON: {e}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check the approach count bounds and that no field is blank.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidApproaches`] naming the first violation.
    pub fn validate(&self) -> Result<()> {
        let count = self.approaches.len();
        if !(MIN_APPROACHES..=MAX_APPROACHES).contains(&count) {
            return Err(RagError::InvalidApproaches(format!(
                "expected between {MIN_APPROACHES} and {MAX_APPROACHES} approaches, got {count}"
            )));
        }
        for (i, approach) in self.approaches.iter().enumerate() {
            let fields = [
                ("title", &approach.title),
                ("query_legal_database", &approach.query_legal_database),
                ("query_legal_acts", &approach.query_legal_acts),
            ];
            if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
                return Err(RagError::InvalidApproaches(format!(
                    "approach {} has an empty {name}",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.approaches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approaches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Approach> {
        self.approaches.iter()
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, e.g. ```json
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
