//! Movie metadata search: normalization, a positional TF-IDF inverted index,
//! two ranking strategies and an IR evaluation harness.

pub mod builder;
pub mod config;
pub mod document;
pub mod evaluate;
pub mod index;
pub mod lexical;
pub mod persist;
pub mod rank;
pub mod service;
pub mod store;
pub mod tokenizer;

pub use config::{FieldWeights, NormalizerConfig, SearchConfig};
pub use document::{DocId, Document, Field};
pub use index::InvertedIndex;
pub use rank::{LexicalRanker, Ranker, VectorRanker};
pub use tokenizer::Normalizer;
