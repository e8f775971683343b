use anyhow::{Context, Result};

use crate::config::FieldWeights;
use crate::document::Document;
use crate::persist::{load_index, save_index, IndexPaths};
use crate::store::RecordStore;
use crate::tokenizer::Normalizer;
use crate::InvertedIndex;

/// Where the index returned by [`IndexBuilder::load_or_build`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Snapshot,
    FreshBuild,
}

/// Feeds store records into an [`InvertedIndex`] and manages its snapshot.
pub struct IndexBuilder {
    normalizer: Normalizer,
    weights: FieldWeights,
    paths: IndexPaths,
}

impl IndexBuilder {
    pub fn new(normalizer: Normalizer, weights: FieldWeights, paths: IndexPaths) -> Self {
        Self { normalizer, weights, paths }
    }

    pub fn normalizer(&self) -> &Normalizer { &self.normalizer }

    pub fn paths(&self) -> &IndexPaths { &self.paths }

    /// Index `docs` into a fresh index and compute weights.
    pub fn build_from_documents<I>(&self, docs: I) -> InvertedIndex
    where
        I: IntoIterator<Item = Document>,
    {
        let mut index = InvertedIndex::new();
        for doc in docs {
            let fields = doc.indexed_fields();
            index.add_document(&self.normalizer, doc.id, fields.iter().map(|(f, t)| (*f, t.as_str())), &self.weights);
        }
        index.compute_weights();
        index
    }

    /// Full scan of the store into a fresh index.
    pub fn build_from_store<S: RecordStore>(&self, store: &S) -> Result<InvertedIndex> {
        let docs = store.scan().context("scanning record store for indexing")?;
        tracing::info!(num_docs = docs.len(), "building index");
        let index = self.build_from_documents(docs);
        tracing::info!(num_docs = index.num_docs(), num_terms = index.vocabulary_len(), "index build complete");
        Ok(index)
    }

    /// Build from the store and persist the snapshot.
    pub fn rebuild<S: RecordStore>(&self, store: &S) -> Result<InvertedIndex> {
        let index = self.build_from_store(store)?;
        save_index(&self.paths, &index)?;
        Ok(index)
    }

    /// Restore the saved snapshot; a missing or unreadable one triggers a rebuild.
    pub fn load_or_build<S: RecordStore>(&self, store: &S) -> Result<(InvertedIndex, IndexOrigin)> {
        match load_index(&self.paths) {
            Ok(index) => {
                tracing::info!(num_docs = index.num_docs(), "loaded index snapshot");
                Ok((index, IndexOrigin::Snapshot))
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "no usable snapshot, building a new index");
                let index = self.build_from_store(store)?;
                if let Err(e) = save_index(&self.paths, &index) {
                    tracing::error!(error = %format!("{e:#}"), "failed to save index snapshot");
                }
                Ok((index, IndexOrigin::FreshBuild))
            }
        }
    }
}
