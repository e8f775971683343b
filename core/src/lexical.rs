//! Substring matcher behind the live search box.
//!
//! Unlike the vector path nothing is normalized here: the raw query is
//! lowercased and split on whitespace, and every term has to occur literally
//! in the lowercased record text.

use regex::RegexBuilder;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::document::{DocId, Document, Field};

pub const EXACT_PHRASE_BONUS: f32 = 100.0;
pub const TITLE_PHRASE_BONUS: f32 = 50.0;
pub const BASE_MATCH_SCORE: f32 = 10.0;
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    #[serde(flatten)]
    pub document: Document,
    pub relevance_score: f32,
    pub highlighted_title: String,
    pub highlighted_description: Option<String>,
}

/// One page of an ordered result list plus the pre-pagination total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Default for Page<T> {
    fn default() -> Self { Self { items: Vec::new(), total: 0 } }
}

pub fn query_terms(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Lowercased concatenation of the searchable fields, space separated.
pub fn haystack(doc: &Document) -> String {
    Field::SEARCHABLE
        .iter()
        .map(|&f| doc.field_text(f).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn contains_all(text: &str, terms: &[String]) -> bool {
    terms.iter().all(|t| text.contains(t.as_str()))
}

/// Heuristic score, or `None` when some term is missing.
pub fn score_document(doc: &Document, query_lower: &str, terms: &[String]) -> Option<f32> {
    let full_text = haystack(doc);
    if !contains_all(&full_text, terms) {
        return None;
    }
    let mut score = 0.0;
    if full_text.contains(query_lower) {
        score += EXACT_PHRASE_BONUS;
    }
    if doc.title.to_lowercase().contains(query_lower) {
        score += TITLE_PHRASE_BONUS;
    }
    score += BASE_MATCH_SCORE;
    Some(score)
}

fn year_key(doc: &Document) -> i32 { doc.year.unwrap_or(0) }

fn by_score_then_year(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| year_key(&b.document).cmp(&year_key(&a.document)))
        .then_with(|| a.document.id.cmp(&b.document.id))
}

/// Wrap every query term longer than one character in `<mark>` tags.
pub fn highlight(text: &str, query: &str, max_chars: Option<usize>) -> String {
    if text.is_empty() || query.is_empty() {
        return text.to_string();
    }
    let mut out = match max_chars {
        Some(max) if text.chars().count() > max => format!("{}...", text.chars().take(max).collect::<String>()),
        _ => text.to_string(),
    };
    let mut terms = query_terms(query);
    terms.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
    for term in terms.iter().filter(|t| t.chars().count() > 1) {
        let Ok(pattern) = RegexBuilder::new(&regex::escape(term)).case_insensitive(true).build() else {
            continue;
        };
        out = pattern.replace_all(&out, "<mark>$0</mark>").into_owned();
    }
    out
}

/// Every document containing all query terms, best first.
pub fn match_documents(query: &str, docs: Vec<Document>) -> Vec<ScoredDocument> {
    let query_lower = query.trim().to_lowercase();
    let terms = query_terms(&query_lower);
    if terms.is_empty() {
        return Vec::new();
    }
    let mut matched: Vec<ScoredDocument> = docs
        .into_iter()
        .filter_map(|doc| {
            let relevance_score = score_document(&doc, &query_lower, &terms)?;
            let highlighted_title = highlight(&doc.title, query, None);
            let highlighted_description = doc
                .description
                .as_deref()
                .map(|d| highlight(d, query, Some(DESCRIPTION_PREVIEW_CHARS)));
            Some(ScoredDocument { document: doc, relevance_score, highlighted_title, highlighted_description })
        })
        .collect();
    matched.sort_by(by_score_then_year);
    matched
}

/// Slice `[(page-1)*per_page, page*per_page)` out of `items`. Page 0 is page 1.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let total = items.len();
    let start = page.max(1).saturating_sub(1).saturating_mul(per_page);
    let items = items.into_iter().skip(start).take(per_page).collect();
    Page { items, total }
}

/// Distinct titles containing `query`, in store order.
pub fn suggest(query: &str, docs: &[Document], limit: usize) -> Vec<String> {
    let needle = query.to_lowercase();
    let mut seen = HashSet::new();
    docs.iter()
        .filter(|d| d.title.to_lowercase().contains(&needle))
        .filter(|&d| seen.insert(d.title.as_str()))
        .take(limit)
        .map(|d| d.title.clone())
        .collect()
}

/// Rated documents by rating, then year, newest first. Unrated ones are left out.
pub fn popular(docs: Vec<Document>, limit: usize) -> Vec<Document> {
    let mut rated: Vec<Document> = docs.into_iter().filter(|d| d.rating.map_or(false, |r| !r.is_nan())).collect();
    rated.sort_by(|a, b| {
        let (ra, rb) = (a.rating.unwrap_or(0.0), b.rating.unwrap_or(0.0));
        rb.total_cmp(&ra)
            .then_with(|| b.year.cmp(&a.year))
            .then_with(|| a.id.cmp(&b.id))
    });
    rated.truncate(limit);
    rated
}

/// Documents whose `field` contains `value` as one substring. Ordered like
/// [`match_documents`]: a title hit ranks first, then newest, then id.
pub fn by_field(field: Field, value: &str, docs: Vec<Document>, limit: usize) -> Vec<Document> {
    let needle = value.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<(f32, Document)> = docs
        .into_iter()
        .filter(|d| d.field_text(field).unwrap_or_default().to_lowercase().contains(&needle))
        .map(|d| {
            let mut score = EXACT_PHRASE_BONUS + BASE_MATCH_SCORE;
            if d.title.to_lowercase().contains(&needle) {
                score += TITLE_PHRASE_BONUS;
            }
            (score, d)
        })
        .collect();
    hits.sort_by(|(sa, a), (sb, b)| {
        sb.total_cmp(sa)
            .then_with(|| year_key(b).cmp(&year_key(a)))
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.into_iter().take(limit).map(|(_, d)| d).collect()
}

/// Ids of a ranked list, in order.
pub fn ids(results: &[ScoredDocument]) -> Vec<DocId> {
    results.iter().map(|r| r.document.id).collect()
}
