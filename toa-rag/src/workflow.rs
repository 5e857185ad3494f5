//! Petition research workflow.
//!
//! [`ApproachExplorer`] walks a legal situation through the research steps:
//! draft a petition from an example, derive the tree of approaches opposing
//! counsel might take, then resolve each approach against the statutes
//! (generator) and the precedent corpus ([`CitationQueryEngine`]).
//!
//! Each step is an independent call; approaches share no state, so
//! [`ApproachExplorer::resolve_all`] runs them concurrently. Drafting and
//! deriving approaches need only the generator; precedent search needs a
//! query engine attached with [`ApproachExplorer::with_engine`].

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::approach::{Approach, MAX_APPROACHES, MIN_APPROACHES, PetitionApproaches};
use crate::citation::{CitationQueryEngine, SynthesizedAnswer};
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;
use crate::prompts::{DERIVE_APPROACHES, DRAFT_PETITION, EXPLAIN_STATUTES, PRECEDENT_SUFFIX, fill};

const DEFAULT_JURISDICTION: &str = "Indian";

/// An approach together with its statute explanation and precedent answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedApproach {
    pub approach: Approach,
    /// Generated explanation of the statutes bearing on the approach.
    pub statutes: String,
    /// Cited precedent search for the approach.
    pub precedents: SynthesizedAnswer,
}

/// Drives the petition research steps over a generator and a query engine.
pub struct ApproachExplorer {
    generator: Arc<dyn TextGenerator>,
    engine: Option<Arc<CitationQueryEngine>>,
    jurisdiction: String,
}

impl ApproachExplorer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator, engine: None, jurisdiction: DEFAULT_JURISDICTION.to_string() }
    }

    /// Attach the precedent query engine.
    pub fn with_engine(mut self, engine: Arc<CitationQueryEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the jurisdiction whose law the prompts target (default: Indian).
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = jurisdiction.into();
        self
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    /// Draft a petition for `situation`, modelled on `example`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidQuery`] for a blank situation and
    /// [`RagError::SynthesisFailed`] if generation fails.
    pub async fn draft_petition(&self, situation: &str, example: &str) -> Result<String> {
        let situation = non_blank(situation, "situation")?;
        let prompt = fill(
            DRAFT_PETITION,
            &[("situation", situation), ("jurisdiction", self.jurisdiction.as_str())],
        );
        let petition = self.complete("draft_petition", &prompt, example).await?;
        info!(petition_len = petition.len(), "petition drafted");
        Ok(petition)
    }

    /// Derive the validated approach tree for `petition`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidApproaches`] if the generator's output does
    /// not parse or validate, and [`RagError::SynthesisFailed`] if it fails.
    pub async fn derive_approaches(&self, petition: &str) -> Result<PetitionApproaches> {
        let petition = non_blank(petition, "petition")?;
        let (min, max) = (MIN_APPROACHES.to_string(), MAX_APPROACHES.to_string());
        let prompt = fill(
            DERIVE_APPROACHES,
            &[
                ("min", min.as_str()),
                ("max", max.as_str()),
                ("jurisdiction", self.jurisdiction.as_str()),
            ],
        );
        let raw = self.complete("derive_approaches", &prompt, petition).await?;
        let approaches = PetitionApproaches::parse(&raw).inspect_err(|e| {
            error!(error = %e, "generator returned invalid approaches");
        })?;
        info!(approach_count = approaches.len(), "approaches derived");
        Ok(approaches)
    }

    /// Explain the statutes relevant to `query` in the light of `petition`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidQuery`] for a blank query and
    /// [`RagError::SynthesisFailed`] if generation fails.
    pub async fn explain_statutes(&self, petition: &str, query: &str) -> Result<String> {
        let query = non_blank(query, "statute query")?;
        let prompt = fill(EXPLAIN_STATUTES, &[("query", query)]);
        self.complete("explain_statutes", &prompt, petition).await
    }

    /// Search the precedent corpus, asking for similar cases when none match exactly.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no query engine is attached.
    pub async fn search_precedents(&self, query: &str) -> Result<SynthesizedAnswer> {
        let query = non_blank(query, "precedent query")?;
        let engine = self.engine.as_ref().ok_or_else(|| {
            RagError::ConfigError("precedent search requires a query engine".to_string())
        })?;
        engine.query(&format!("{query}{PRECEDENT_SUFFIX}")).await
    }

    /// Resolve one approach: statutes and precedents are fetched concurrently.
    pub async fn resolve(&self, petition: &str, approach: &Approach) -> Result<ResolvedApproach> {
        let (statutes, precedents) = futures::try_join!(
            self.explain_statutes(petition, &approach.query_legal_acts),
            self.search_precedents(&approach.query_legal_database),
        )?;
        info!(
            approach = %approach.title,
            citation_count = precedents.citations.len(),
            "approach resolved"
        );
        Ok(ResolvedApproach { approach: approach.clone(), statutes, precedents })
    }

    /// Resolve every approach concurrently, in input order.
    ///
    /// Fails with the first error any approach produces.
    pub async fn resolve_all(
        &self,
        petition: &str,
        approaches: &PetitionApproaches,
    ) -> Result<Vec<ResolvedApproach>> {
        try_join_all(approaches.iter().map(|approach| self.resolve(petition, approach))).await
    }

    async fn complete(&self, step: &str, prompt: &str, context: &str) -> Result<String> {
        let reply = self.generator.generate(prompt, context).await.map_err(|e| {
            error!(step, generator = self.generator.name(), error = %e, "generation failed");
            match e {
                RagError::SynthesisFailed(_) => e,
                other => RagError::SynthesisFailed(format!("{step}: {other}")),
            }
        })?;
        let reply = reply.trim();
        if reply.is_empty() {
            error!(step, generator = self.generator.name(), "generator returned empty content");
            return Err(RagError::SynthesisFailed(format!(
                "{step}: generator returned empty content"
            )));
        }
        Ok(reply.to_string())
    }
}

fn non_blank<'a>(text: &'a str, what: &str) -> Result<&'a str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RagError::InvalidQuery(format!("{what} must not be empty")));
    }
    Ok(trimmed)
}
