//! Storage context: the vector index, document store, and index store loaded
//! together and checked for mutual consistency.
//!
//! A [`StorageContext`] is constructed once at process start and then handed
//! to the [`Retriever`](crate::Retriever) as shared, read-only state.
//!
//! # Example
//!
//! ```rust,ignore
//! use toa_rag::StorageContext;
//!
//! let storage = StorageContext::load(Path::new("storage"))?;
//! storage.verify_embedding("text-embedding-ada-002", 1536)?;
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::docstore::DocumentStore;
use crate::error::{RagError, Result};
use crate::flat::FlatIndex;
use crate::indexstore::IndexStore;
use crate::persist::{DOCSTORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE};
use crate::vectorstore::VectorIndex;

/// The three persisted artifacts of one logical index.
#[derive(Debug, Clone)]
pub struct StorageContext {
    vector_index: Arc<FlatIndex>,
    docstore: Arc<DocumentStore>,
    index_store: Arc<IndexStore>,
}

impl StorageContext {
    /// Combine in-memory stores, verifying they describe the same chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorruptStore`] if the stores disagree.
    pub fn from_parts(
        vector_index: FlatIndex,
        docstore: DocumentStore,
        index_store: IndexStore,
    ) -> Result<Self> {
        check_consistency(&vector_index, &docstore, &index_store)?;
        Ok(Self {
            vector_index: Arc::new(vector_index),
            docstore: Arc::new(docstore),
            index_store: Arc::new(index_store),
        })
    }

    /// Load all three artifacts from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if any artifact is missing or
    /// unreadable, and [`RagError::CorruptStore`] if any is malformed or the
    /// three do not share the same chunk-id universe.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            error!(path = %dir.display(), "persist directory not found");
            return Err(RagError::IndexUnavailable {
                path: dir.display().to_string(),
                message: "persist directory does not exist".to_string(),
            });
        }
        let vector_index = FlatIndex::load(&dir.join(VECTOR_STORE_FILE))?;
        let docstore = DocumentStore::load(&dir.join(DOCSTORE_FILE))?;
        let index_store = IndexStore::load(&dir.join(INDEX_STORE_FILE))?;
        let storage = Self::from_parts(vector_index, docstore, index_store).inspect_err(|e| {
            error!(path = %dir.display(), error = %e, "persisted stores are inconsistent");
        })?;
        info!(
            path = %dir.display(),
            index_id = %storage.index_store.index_id(),
            chunk_count = storage.chunk_count(),
            document_count = storage.index_store.document_count(),
            "loaded storage context"
        );
        Ok(storage)
    }

    /// Write all three artifacts into `dir`.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        self.vector_index.persist(&dir.join(VECTOR_STORE_FILE))?;
        self.docstore.persist(&dir.join(DOCSTORE_FILE))?;
        self.index_store.persist(&dir.join(INDEX_STORE_FILE))?;
        info!(path = %dir.display(), chunk_count = self.chunk_count(), "persisted storage context");
        Ok(())
    }

    /// Check that the index was built with the query-time embedding model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigMismatch`] if the model identifier or the
    /// dimensionality differs.
    pub fn verify_embedding(&self, model: &str, dimensions: usize) -> Result<()> {
        let persisted = self.index_store.embedding_model();
        if persisted != model {
            return Err(RagError::ConfigMismatch {
                field: "embedding_model".to_string(),
                expected: model.to_string(),
                found: persisted.to_string(),
            });
        }
        if self.index_store.dimensions() != dimensions {
            return Err(RagError::ConfigMismatch {
                field: "dimensions".to_string(),
                expected: dimensions.to_string(),
                found: self.index_store.dimensions().to_string(),
            });
        }
        Ok(())
    }

    /// The shared vector index.
    pub fn vector_index(&self) -> Arc<FlatIndex> {
        Arc::clone(&self.vector_index)
    }

    /// The shared document store.
    pub fn docstore(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.docstore)
    }

    /// The shared index store.
    pub fn index_store(&self) -> Arc<IndexStore> {
        Arc::clone(&self.index_store)
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        self.vector_index.len()
    }
}

/// Verify that the three stores agree on dimensions, chunk ids, and
/// chunk-to-document mapping. Reports the first offending id in sorted order.
fn check_consistency(
    vector_index: &FlatIndex,
    docstore: &DocumentStore,
    index_store: &IndexStore,
) -> Result<()> {
    if vector_index.dimensions() != index_store.dimensions() {
        return Err(RagError::CorruptStore(format!(
            "vector store has {} dimensions but index store records {}",
            vector_index.dimensions(),
            index_store.dimensions()
        )));
    }

    let vector_ids: BTreeSet<&str> = vector_index.chunk_ids().into_iter().collect();
    let doc_ids: BTreeSet<&str> = docstore.chunk_ids().collect();
    let mapped_ids: BTreeSet<&str> =
        index_store.nodes().iter().map(|n| n.chunk_id.as_str()).collect();

    let stores = [
        ("vector store", &vector_ids),
        ("document store", &doc_ids),
        ("index store", &mapped_ids),
    ];
    let universe: BTreeSet<&str> =
        vector_ids.iter().chain(doc_ids.iter()).chain(mapped_ids.iter()).copied().collect();
    for id in universe {
        let present: Vec<&str> =
            stores.iter().filter(|(_, ids)| ids.contains(id)).map(|(name, _)| *name).collect();
        if let Some((missing, _)) = stores.iter().find(|(_, ids)| !ids.contains(id)) {
            return Err(RagError::CorruptStore(format!(
                "chunk '{id}' is referenced by the {} but missing from the {missing}",
                present.join(" and ")
            )));
        }
    }

    for node in index_store.nodes() {
        let stored = docstore.get(&node.chunk_id)?;
        if stored.document_id != node.document_id {
            return Err(RagError::CorruptStore(format!(
                "chunk '{}' belongs to document '{}' in the document store \
                 but '{}' in the index store",
                node.chunk_id, stored.document_id, node.document_id
            )));
        }
    }

    Ok(())
}
