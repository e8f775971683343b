use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::FieldWeights;
use crate::document::{DocId, Field};
use crate::tokenizer::Normalizer;

/// Token positions of one term inside one document's weighted token stream.
pub type Positions = Vec<u32>;

/// Positional inverted index with sparse TF-IDF rows.
///
/// All maps are ordered so that serializing the same index twice yields the
/// same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub postings: BTreeMap<String, BTreeMap<DocId, Positions>>,
    pub doc_lengths: BTreeMap<DocId, u32>,
    pub doc_count: u32,
    pub vocabulary: BTreeSet<String>,
    pub tf_idf: BTreeMap<DocId, BTreeMap<String, f32>>, // only non-zero weights
    pub idf: BTreeMap<String, f32>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Index one document, replacing whatever was stored under `doc_id`.
    ///
    /// Each term of a field is appended `weights.repeat_count(field)` times.
    /// Weights are not refreshed; call [`InvertedIndex::compute_weights`]
    /// once the batch is done.
    pub fn add_document<'a, I>(&mut self, normalizer: &Normalizer, doc_id: DocId, fields: I, weights: &FieldWeights)
    where
        I: IntoIterator<Item = (Field, &'a str)>,
    {
        let is_new = !self.doc_lengths.contains_key(&doc_id);
        if !is_new {
            self.drop_postings(doc_id);
            self.tf_idf.remove(&doc_id);
        }

        let mut term_positions: BTreeMap<String, Positions> = BTreeMap::new();
        let mut position: u32 = 0;
        for (field, text) in fields {
            if text.trim().is_empty() {
                continue;
            }
            let repeat = weights.repeat_count(field);
            for term in normalizer.normalize(text) {
                for _ in 0..repeat {
                    term_positions.entry(term.clone()).or_default().push(position);
                    position += 1;
                }
            }
        }

        for (term, positions) in term_positions {
            self.vocabulary.insert(term.clone());
            self.postings.entry(term).or_default().insert(doc_id, positions);
        }
        self.doc_lengths.insert(doc_id, position);
        if is_new {
            self.doc_count += 1;
        }
        tracing::debug!(doc_id, tokens = position, "indexed document");
    }

    /// Remove a document's postings, length and weight row.
    pub fn remove_document(&mut self, doc_id: DocId) -> bool {
        if self.doc_lengths.remove(&doc_id).is_none() {
            return false;
        }
        self.drop_postings(doc_id);
        self.tf_idf.remove(&doc_id);
        self.doc_count -= 1;
        true
    }

    fn drop_postings(&mut self, doc_id: DocId) {
        // Vocabulary entries survive with df = 0.
        self.postings.retain(|_, plist| {
            plist.remove(&doc_id);
            !plist.is_empty()
        });
    }

    /// Recompute idf for the vocabulary and every document's tf-idf row.
    pub fn compute_weights(&mut self) {
        let n = self.doc_count as f32;
        self.idf = self
            .vocabulary
            .iter()
            .map(|term| {
                let df = self.doc_frequency(term);
                let idf = if df > 0 { (n / df as f32).ln() } else { 0.0 };
                (term.clone(), idf)
            })
            .collect();

        let mut rows: BTreeMap<DocId, BTreeMap<String, f32>> =
            self.doc_lengths.keys().map(|&d| (d, BTreeMap::new())).collect();
        for (term, plist) in &self.postings {
            let idf = self.idf.get(term).copied().unwrap_or(0.0);
            if idf == 0.0 {
                continue;
            }
            for (doc_id, positions) in plist {
                let len = self.doc_lengths.get(doc_id).copied().unwrap_or(0);
                if len == 0 {
                    continue;
                }
                let tf = positions.len() as f32 / len as f32;
                rows.entry(*doc_id).or_default().insert(term.clone(), tf * idf);
            }
        }
        self.tf_idf = rows;
        tracing::info!(num_terms = self.vocabulary.len(), num_docs = self.doc_count, "computed tf-idf weights");
    }

    pub fn num_docs(&self) -> u32 { self.doc_count }

    pub fn vocabulary_len(&self) -> usize { self.vocabulary.len() }

    pub fn doc_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, BTreeMap::len)
    }

    pub fn idf(&self, term: &str) -> Option<f32> { self.idf.get(term).copied() }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> { self.doc_lengths.get(&doc_id).copied() }

    pub fn positions(&self, term: &str, doc_id: DocId) -> Option<&[u32]> {
        self.postings.get(term)?.get(&doc_id).map(Vec::as_slice)
    }

    /// Stored tf-idf weight; 0 when the term is absent from the document.
    pub fn weight(&self, doc_id: DocId, term: &str) -> f32 {
        self.tf_idf.get(&doc_id).and_then(|row| row.get(term)).copied().unwrap_or(0.0)
    }

    /// Query terms weighted against corpus idf. Terms outside the vocabulary
    /// and terms with zero weight are dropped.
    pub fn query_vector(&self, terms: &[String]) -> BTreeMap<String, f32> {
        if terms.is_empty() {
            return BTreeMap::new();
        }
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for t in terms {
            *counts.entry(t.as_str()).or_insert(0) += 1;
        }
        let len = terms.len() as f32;
        counts
            .into_iter()
            .filter(|(t, _)| self.vocabulary.contains(*t))
            .filter_map(|(t, c)| {
                let w = (c as f32 / len) * self.idf(t).unwrap_or(0.0);
                (w > 0.0).then(|| (t.to_string(), w))
            })
            .collect()
    }

    /// Cosine-similarity search over already-normalized query terms.
    ///
    /// Both norms are taken over the query terms only. Ties are broken by
    /// ascending document id.
    pub fn search_terms(&self, terms: &[String], top_k: usize) -> Vec<(DocId, f32)> {
        let q = self.query_vector(terms);
        let q_norm = q.values().map(|w| w * w).sum::<f32>().sqrt();
        if q_norm == 0.0 {
            return Vec::new();
        }

        let candidates: BTreeSet<DocId> = q
            .keys()
            .filter_map(|t| self.postings.get(t))
            .flat_map(|plist| plist.keys().copied())
            .collect();

        let mut scored: Vec<(DocId, f32)> = Vec::with_capacity(candidates.len());
        for doc_id in candidates {
            let Some(row) = self.tf_idf.get(&doc_id) else { continue };
            let mut dot = 0.0f32;
            let mut d_norm = 0.0f32;
            for (term, q_w) in &q {
                let d_w = row.get(term).copied().unwrap_or(0.0);
                dot += q_w * d_w;
                d_norm += d_w * d_w;
            }
            if d_norm == 0.0 {
                continue;
            }
            let score = (dot / (d_norm.sqrt() * q_norm)).clamp(0.0, 1.0);
            scored.push((doc_id, score));
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored
    }

    /// Normalize `query` and rank documents by cosine similarity.
    pub fn search(&self, normalizer: &Normalizer, query: &str, top_k: usize) -> Vec<(DocId, f32)> {
        let terms = normalizer.normalize(query);
        if terms.is_empty() {
            return Vec::new();
        }
        self.search_terms(&terms, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(idx: &mut InvertedIndex, id: DocId, title: &str, genre: &str) {
        let n = Normalizer::default();
        idx.add_document(&n, id, [(Field::Title, title), (Field::Genre, genre)], &FieldWeights::default());
    }

    #[test]
    fn title_terms_are_repeated() {
        let mut idx = InvertedIndex::new();
        add(&mut idx, 1, "Mai", "tâm lý");
        assert_eq!(idx.positions("mai", 1), Some(&[0u32, 1][..]));
        assert_eq!(idx.positions("tâm", 1), Some(&[2u32][..]));
        assert_eq!(idx.doc_length(1), Some(4));
    }

    #[test]
    fn readding_replaces_postings() {
        let mut idx = InvertedIndex::new();
        add(&mut idx, 1, "Lật mặt", "hành động");
        add(&mut idx, 1, "Mai", "tâm lý");
        assert_eq!(idx.num_docs(), 1);
        assert_eq!(idx.doc_frequency("lật"), 0);
        assert_eq!(idx.doc_frequency("mai"), 1);
        idx.compute_weights();
        assert_eq!(idx.idf("lật"), Some(0.0));
    }

    #[test]
    fn idf_and_weights() {
        let mut idx = InvertedIndex::new();
        add(&mut idx, 1, "Đào phở", "hài");
        add(&mut idx, 2, "Nhà bà nữ", "hài");
        idx.compute_weights();
        assert_eq!(idx.idf("hài"), Some(0.0));
        let idf = idx.idf("đào").unwrap();
        assert!((idf - 2f32.ln()).abs() < 1e-6);
        // doc 1: đào đào phở phở hài -> tf(đào) = 2/5
        assert!((idx.weight(1, "đào") - 0.4 * idf).abs() < 1e-6);
        assert_eq!(idx.weight(2, "đào"), 0.0);
    }

    #[test]
    fn search_ranks_and_skips_unscorable() {
        let mut idx = InvertedIndex::new();
        add(&mut idx, 1, "Kẻ ăn hồn", "kinh dị");
        add(&mut idx, 2, "Kinh dị đêm", "kinh");
        add(&mut idx, 3, "Mai", "tâm lý");
        idx.compute_weights();
        let n = Normalizer::default();
        let hits = idx.search(&n, "kinh dị", 10);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 2]);
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.1)));
        assert!(idx.search(&n, "và của", 10).is_empty());
        assert!(idx.search(&n, "zzz", 10).is_empty());
    }

    #[test]
    fn equal_scores_fall_back_to_ascending_id() {
        let mut idx = InvertedIndex::new();
        add(&mut idx, 9, "Ma da", "kinh dị");
        add(&mut idx, 4, "Ma da", "kinh dị");
        add(&mut idx, 6, "Mai", "tâm lý");
        idx.compute_weights();
        assert_eq!(idx.tf_idf[&9], idx.tf_idf[&4]);
        let hits = idx.search(&Normalizer::default(), "ma da", 10);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![4, 9]);
        assert_eq!(hits[0].1, hits[1].1);
    }

    #[test]
    fn remove_document_clears_everything() {
        let mut idx = InvertedIndex::new();
        add(&mut idx, 1, "Mai", "tâm lý");
        idx.compute_weights();
        assert!(idx.remove_document(1));
        assert!(!idx.remove_document(1));
        assert_eq!(idx.num_docs(), 0);
        assert!(idx.postings.is_empty());
        assert!(idx.tf_idf.is_empty());
    }
}
