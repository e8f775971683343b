//! Ranking quality against ground truth derived from the record store.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::document::{DocId, Document, Field};
use crate::rank::Ranker;
use crate::store::RecordStore;

/// Query text -> ids judged relevant, ascending.
pub type GroundTruth = BTreeMap<String, BTreeSet<DocId>>;

/// Declarative relevance rule over record fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Case-insensitive substring match against any of the alternatives.
    FieldContains { field: Field, any_of: Vec<String> },
    YearEquals(i32),
}

impl Predicate {
    pub fn field_contains(field: Field, needle: &str) -> Self {
        Predicate::FieldContains { field, any_of: vec![needle.to_string()] }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Predicate::FieldContains { field, any_of } => {
                let Some(text) = doc.field_text(*field) else { return false };
                let text = text.to_lowercase();
                any_of.iter().any(|n| text.contains(&n.to_lowercase()))
            }
            Predicate::YearEquals(year) => doc.year == Some(*year),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub query: String,
    pub predicate: Predicate,
}

impl Scenario {
    pub fn new(query: &str, predicate: Predicate) -> Self {
        Self { query: query.to_string(), predicate }
    }
}

/// Genre, country and release-year queries matching the crawled categories.
pub fn default_scenarios() -> Vec<Scenario> {
    let genre = |q: &str, needle: &str| Scenario::new(q, Predicate::field_contains(Field::Genre, needle));
    let country = |q: &str, needle: &str| Scenario::new(q, Predicate::field_contains(Field::Country, needle));
    vec![
        genre("Cổ trang", "cổ trang"),
        genre("Chính kịch", "chính kịch"),
        genre("Bí ẩn", "bí ẩn"),
        genre("Gia đình", "gia đình"),
        genre("Hài hước", "hài"),
        genre("Hành động", "hành động"),
        genre("Hình sự", "hình sự"),
        genre("Khoa học", "khoa học"),
        genre("Kinh dị", "kinh dị"),
        genre("Phiêu lưu", "phiêu lưu"),
        genre("Tâm lý", "tâm lý"),
        genre("Tình cảm", "tình cảm"),
        genre("Viễn tưởng", "viễn tưởng"),
        genre("Võ thuật", "võ thuật"),
        country("Trung Quốc", "trung quốc"),
        country("Hàn Quốc", "hàn quốc"),
        country("Thái Lan", "thái lan"),
        Scenario::new(
            "Âu Mỹ",
            Predicate::FieldContains { field: Field::Country, any_of: vec!["âu mỹ".into(), "mỹ".into()] },
        ),
        country("Việt Nam", "việt nam"),
        Scenario::new("2024", Predicate::YearEquals(2024)),
        Scenario::new("2025", Predicate::YearEquals(2025)),
    ]
}

/// One scan of the store; scenarios nothing matches are left out.
pub fn build_ground_truth<S: RecordStore>(store: &S, scenarios: &[Scenario]) -> Result<GroundTruth> {
    let docs = store.scan().context("scanning record store for ground truth")?;
    let mut truth = GroundTruth::new();
    for scenario in scenarios {
        let ids: BTreeSet<DocId> = docs.iter().filter(|d| scenario.predicate.matches(d)).map(|d| d.id).collect();
        if ids.is_empty() {
            tracing::debug!(query = %scenario.query, "no relevant documents, query skipped");
            continue;
        }
        truth.insert(scenario.query.clone(), ids);
    }
    tracing::info!(queries = truth.len(), scenarios = scenarios.len(), "built ground truth");
    Ok(truth)
}

pub fn save_ground_truth(path: &Path, truth: &GroundTruth) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(truth)?)
        .with_context(|| format!("writing ground truth to {}", path.display()))?;
    Ok(())
}

pub fn load_ground_truth(path: &Path) -> Result<GroundTruth> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub average_precision: f64,
    pub retrieved_count: usize,
    pub relevant_count: usize,
}

/// Precision, recall, F1 and AP of a ranked id list. `None` when nothing is relevant.
pub fn compute_metrics(retrieved: &[DocId], relevant: &BTreeSet<DocId>, k: usize) -> Option<QueryMetrics> {
    if relevant.is_empty() {
        return None;
    }
    let retrieved = &retrieved[..retrieved.len().min(k)];
    let hits_total = retrieved.iter().filter(|d| relevant.contains(d)).count();

    let precision = if retrieved.is_empty() { 0.0 } else { hits_total as f64 / retrieved.len() as f64 };
    let recall = hits_total as f64 / relevant.len() as f64;
    let f1 = if precision + recall > 0.0 { 2.0 * precision * recall / (precision + recall) } else { 0.0 };

    let mut hits = 0usize;
    let mut sum_precisions = 0.0;
    for (i, doc_id) in retrieved.iter().enumerate() {
        if relevant.contains(doc_id) {
            hits += 1;
            sum_precisions += hits as f64 / (i + 1) as f64;
        }
    }
    let denom = relevant.len().min(k);
    let average_precision = if denom == 0 { 0.0 } else { sum_precisions / denom as f64 };

    Some(QueryMetrics {
        precision,
        recall,
        f1,
        average_precision,
        retrieved_count: retrieved.len(),
        relevant_count: relevant.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Excellent,
    Good,
    NeedsImprovement,
}

impl Verdict {
    pub fn from_map(map: f64) -> Self {
        if map > 0.7 {
            Verdict::Excellent
        } else if map > 0.4 {
            Verdict::Good
        } else {
            Verdict::NeedsImprovement
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Excellent => "excellent",
            Verdict::Good => "good",
            Verdict::NeedsImprovement => "needs improvement",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub query: String,
    pub metrics: QueryMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub ranker: String,
    pub k: usize,
    pub queries: Vec<QueryReport>,
    pub mean_average_precision: f64,
    pub verdict: Verdict,
}

/// Runs a ranker over every evaluable query of a ground-truth set.
pub struct Evaluator<R> {
    ranker: R,
    ground_truth: GroundTruth,
}

impl<R: Ranker> Evaluator<R> {
    pub fn new(ranker: R, ground_truth: GroundTruth) -> Self {
        Self { ranker, ground_truth }
    }

    pub fn ground_truth(&self) -> &GroundTruth { &self.ground_truth }

    /// Metrics for one query; `None` when the query has no ground truth.
    pub fn metrics(&self, query: &str, k: usize) -> Result<Option<QueryMetrics>> {
        let Some(relevant) = self.ground_truth.get(query) else { return Ok(None) };
        let retrieved: Vec<DocId> = self.ranker.rank(query, k)?.into_iter().map(|(d, _)| d).collect();
        Ok(compute_metrics(&retrieved, relevant, k))
    }

    /// Every evaluable query in alphabetical order, plus mean AP.
    pub fn evaluate(&self, k: usize) -> Result<EvaluationReport> {
        let mut queries = Vec::with_capacity(self.ground_truth.len());
        for query in self.ground_truth.keys() {
            if let Some(metrics) = self.metrics(query, k)? {
                tracing::debug!(%query, ap = metrics.average_precision, "evaluated query");
                queries.push(QueryReport { query: query.clone(), metrics });
            }
        }
        let mean_average_precision = if queries.is_empty() {
            0.0
        } else {
            queries.iter().map(|q| q.metrics.average_precision).sum::<f64>() / queries.len() as f64
        };
        tracing::info!(ranker = self.ranker.name(), k, queries = queries.len(), map = mean_average_precision, "evaluation finished");
        Ok(EvaluationReport {
            ranker: self.ranker.name().to_string(),
            k,
            queries,
            mean_average_precision,
            verdict: Verdict::from_map(mean_average_precision),
        })
    }
}
