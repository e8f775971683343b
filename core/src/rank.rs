//! Interchangeable ranking strategies over the same corpus.
//!
//! [`LexicalRanker`] is what the serving path uses; [`VectorRanker`] is the
//! TF-IDF cosine alternative. The two are never blended.

use anyhow::Result;

use crate::document::DocId;
use crate::lexical::match_documents;
use crate::store::RecordStore;
use crate::tokenizer::Normalizer;
use crate::InvertedIndex;

pub trait Ranker {
    fn name(&self) -> &'static str;

    /// At most `k` (document, score) pairs, best first.
    fn rank(&self, query: &str, k: usize) -> Result<Vec<(DocId, f32)>>;
}

impl<R: Ranker + ?Sized> Ranker for &R {
    fn name(&self) -> &'static str { (**self).name() }
    fn rank(&self, query: &str, k: usize) -> Result<Vec<(DocId, f32)>> { (**self).rank(query, k) }
}

pub struct LexicalRanker<S> {
    store: S,
}

impl<S: RecordStore> LexicalRanker<S> {
    pub fn new(store: S) -> Self { Self { store } }
}

impl<S: RecordStore> Ranker for LexicalRanker<S> {
    fn name(&self) -> &'static str { "lexical" }

    fn rank(&self, query: &str, k: usize) -> Result<Vec<(DocId, f32)>> {
        let docs = self.store.scan()?;
        Ok(match_documents(query, docs)
            .into_iter()
            .take(k)
            .map(|r| (r.document.id, r.relevance_score))
            .collect())
    }
}

pub struct VectorRanker {
    index: InvertedIndex,
    normalizer: Normalizer,
}

impl VectorRanker {
    pub fn new(index: InvertedIndex, normalizer: Normalizer) -> Self { Self { index, normalizer } }

    pub fn index(&self) -> &InvertedIndex { &self.index }
}

impl Ranker for VectorRanker {
    fn name(&self) -> &'static str { "vector" }

    fn rank(&self, query: &str, k: usize) -> Result<Vec<(DocId, f32)>> {
        Ok(self.index.search(&self.normalizer, query, k))
    }
}
