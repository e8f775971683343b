//! Invariants of the inverted index, the cosine ranker and the lexical filter.

use cinesearch_core::lexical::{ids, match_documents};
use cinesearch_core::persist::{decode_snapshot, encode_snapshot};
use cinesearch_core::{DocId, Document, Field, FieldWeights, InvertedIndex, Normalizer};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn word_strategy() -> impl Strategy<Value = String> {
    // the leading "q" keeps generated words clear of the stopword list
    prop::string::string_regex("q[a-z]{1,6}").unwrap()
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(word_strategy(), 1..8).prop_map(|w| w.join(" "))
}

fn corpus_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((text_strategy(), text_strategy()), 1..6)
}

fn build(corpus: &[(String, String)]) -> InvertedIndex {
    let n = Normalizer::default();
    let mut idx = InvertedIndex::new();
    for (i, (title, body)) in corpus.iter().enumerate() {
        idx.add_document(
            &n,
            i as DocId,
            [(Field::Title, title.as_str()), (Field::Description, body.as_str())],
            &FieldWeights::default(),
        );
    }
    idx.add_document(&n, 999, [(Field::Description, "xfiller")], &FieldWeights::default());
    idx.compute_weights();
    idx
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_readd_leaves_no_residue(corpus in corpus_strategy(), first in text_strategy(), second in text_strategy()) {
        let n = Normalizer::default();
        let mut idx = build(&corpus);
        idx.add_document(&n, 500, [(Field::Description, first.as_str())], &FieldWeights::uniform());
        idx.add_document(&n, 500, [(Field::Description, second.as_str())], &FieldWeights::uniform());

        let expected: BTreeSet<String> = n.normalize(&second).into_iter().collect();
        for (term, plist) in &idx.postings {
            prop_assert_eq!(plist.contains_key(&500), expected.contains(term), "term {}", term);
        }
        prop_assert_eq!(idx.doc_length(500), Some(n.normalize(&second).len() as u32));
        prop_assert_eq!(idx.num_docs() as usize, corpus.len() + 2);
    }

    #[test]
    fn prop_index_invariants(corpus in corpus_strategy()) {
        let idx = build(&corpus);
        for (term, plist) in &idx.postings {
            prop_assert!(idx.vocabulary.contains(term));
            prop_assert!(idx.idf(term).is_some());
            for doc_id in plist.keys() {
                prop_assert!(idx.doc_length(*doc_id).is_some());
            }
        }
        for row in idx.tf_idf.values() {
            prop_assert!(row.values().all(|w| *w >= 0.0));
        }
    }

    #[test]
    fn prop_idf_non_increasing_in_df(corpus in corpus_strategy()) {
        let idx = build(&corpus);
        let terms: Vec<&String> = idx.vocabulary.iter().collect();
        for a in &terms {
            for b in &terms {
                if idx.doc_frequency(a) < idx.doc_frequency(b) {
                    prop_assert!(idx.idf(a).unwrap() >= idx.idf(b).unwrap());
                }
            }
        }
    }

    #[test]
    fn prop_cosine_scores_in_unit_interval(corpus in corpus_strategy(), query in text_strategy()) {
        let idx = build(&corpus);
        let hits = idx.search(&Normalizer::default(), &query, 100);
        for w in hits.windows(2) {
            prop_assert!(w[0].1 >= w[1].1);
        }
        prop_assert!(hits.iter().all(|(_, s)| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn prop_query_as_document_scores_one(corpus in corpus_strategy(), query in text_strategy()) {
        let n = Normalizer::default();
        let mut idx = build(&corpus);
        idx.add_document(&n, 777, [(Field::Description, query.as_str())], &FieldWeights::uniform());
        idx.compute_weights();
        let hits = idx.search(&n, &query, usize::MAX);
        if let Some((_, score)) = hits.iter().find(|(d, _)| *d == 777) {
            prop_assert!((score - 1.0).abs() < 1e-4, "score {}", score);
        } else {
            // only possible when every query term occurs in every document
            prop_assert!(n.normalize(&query).iter().all(|t| idx.idf(t) == Some(0.0)));
        }
    }

    #[test]
    fn prop_snapshot_round_trip(corpus in corpus_strategy()) {
        let idx = build(&corpus);
        let bytes = encode_snapshot(&idx).unwrap();
        let restored = decode_snapshot(&bytes).unwrap();
        prop_assert_eq!(&restored, &idx);
        prop_assert_eq!(encode_snapshot(&restored).unwrap(), bytes);
    }

    #[test]
    fn prop_more_terms_never_widen_lexical_matches(corpus in corpus_strategy(), q in word_strategy(), extra in word_strategy()) {
        let docs: Vec<Document> = corpus
            .iter()
            .enumerate()
            .map(|(i, (title, genre))| Document { genre: Some(genre.clone()), ..Document::new(i as DocId, title.clone()) })
            .collect();
        let narrow: BTreeSet<DocId> = ids(&match_documents(&format!("{q} {extra}"), docs.clone())).into_iter().collect();
        let wide: BTreeSet<DocId> = ids(&match_documents(&q, docs)).into_iter().collect();
        prop_assert!(narrow.is_subset(&wide));
    }
}
