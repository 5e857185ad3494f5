//! Text generation trait for the hosted language model collaborator.

use async_trait::async_trait;

use crate::error::Result;

/// A generative language model reached through a potentially slow,
/// potentially failing remote call.
///
/// `prompt` carries the instruction and `context` the grounding material
/// (retrieved sources, an example petition, ...). Implementations return
/// the raw completion text; callers decide what an empty reply means.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a completion for the given instruction and context.
    async fn generate(&self, prompt: &str, context: &str) -> Result<String>;

    /// Return the identifier of the underlying model.
    fn name(&self) -> &str;
}
