//! Reading documents and approach files from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use toa_rag::{Document, PetitionApproaches};

/// Read one [`Document`] per non-blank line of a JSONL file.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read documents from {}", path.display()))?;
    let mut documents = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid document", path.display(), number + 1))?;
        documents.push(document);
    }
    if documents.is_empty() {
        bail!("{} contains no documents", path.display());
    }
    Ok(documents)
}

/// Read a text file, rejecting blank content.
pub fn read_text(path: &Path) -> Result<String> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(text)
}

/// Read and validate an approaches JSON file.
pub fn load_approaches(path: &Path) -> Result<PetitionApproaches> {
    let raw = read_text(path)?;
    PetitionApproaches::parse(&raw)
        .with_context(|| format!("invalid approaches in {}", path.display()))
}
