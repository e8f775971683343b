use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizerConfig;

lazy_static! {
    static ref HTML_TAGS: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
    // Word characters, whitespace and the Latin-with-diacritics block survive.
    static ref SPECIAL_CHARS: Regex = Regex::new(r"[^\w\s\x{00C0}-\x{1EF9}]").expect("valid regex");
    static ref NUMBERS: Regex = Regex::new(r"\d+").expect("valid regex");
    static ref MULTIPLE_SPACES: Regex = Regex::new(r"\s+").expect("valid regex");
}

pub const DEFAULT_STOPWORDS: &[&str] = &[
    "là", "của", "và", "có", "được", "một", "trong", "cho", "với", "này",
    "đó", "những", "các", "để", "từ", "không", "đã", "sẽ", "bị", "bởi",
    "về", "tại", "lại", "như", "hay", "hoặc", "nếu", "mà", "khi", "nào",
    "đâu", "ai", "gì", "sao", "thế", "vậy", "rất", "lắm", "nhiều", "ít",
    "mỗi", "tất", "toàn", "cả", "chỉ", "duy", "nhất", "cũng", "thêm",
    "nữa", "khác", "giữa", "trước", "sau", "trên", "dưới", "ngoài", "theo",
];

/// NFC-compose and lowercase, the canonical form of every term and word list entry.
fn fold(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Read a newline-delimited UTF-8 word list, one entry per line.
pub fn load_word_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(|l| MULTIPLE_SPACES.replace_all(l.trim(), " ").into_owned())
        .filter(|l| !l.is_empty())
        .map(|l| fold(&l))
        .collect())
}

/// Greedy longest-match merger of known multi-word units.
#[derive(Debug, Clone, Default)]
pub struct CompoundSegmenter {
    compounds: HashSet<String>,
    max_words: usize,
}

impl CompoundSegmenter {
    pub fn new<I, S>(compounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compounds_set = HashSet::new();
        let mut max_words = 1;
        for c in compounds {
            let c = fold(c.as_ref().trim());
            let words = c.split_whitespace().count();
            if words < 2 {
                continue;
            }
            max_words = max_words.max(words);
            compounds_set.insert(c.split_whitespace().collect::<Vec<_>>().join(" "));
        }
        Self { compounds: compounds_set, max_words }
    }

    pub fn len(&self) -> usize { self.compounds.len() }

    pub fn is_empty(&self) -> bool { self.compounds.is_empty() }

    pub fn segment(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut out = Vec::with_capacity(words.len());
        let mut i = 0;
        while i < words.len() {
            let longest = (self.max_words.min(words.len() - i)).max(1);
            let mut taken = 1;
            for n in (2..=longest).rev() {
                let candidate = words[i..i + n].join(" ");
                if self.compounds.contains(&candidate) {
                    out.push(candidate);
                    taken = n;
                    break;
                }
            }
            if taken == 1 {
                out.push(words[i].to_string());
            }
            i += taken;
        }
        out
    }
}

#[derive(Debug, Clone)]
enum Segmentation {
    Whitespace,
    Compound(CompoundSegmenter),
}

/// Cleans raw text and turns it into filtered terms.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stopwords: HashSet<String>,
    segmentation: Segmentation,
    min_len: usize,
    max_len: usize,
    degraded: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl Normalizer {
    /// Never fails: unreadable optional word lists are logged and skipped.
    pub fn new(config: &NormalizerConfig) -> Self {
        let mut stopwords: HashSet<String> = DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect();
        if let Some(path) = &config.stopwords_path {
            match load_word_list(path) {
                Ok(words) => {
                    tracing::debug!(path = %path.display(), count = words.len(), "loaded stopword file");
                    stopwords.extend(words);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot load stopwords, using built-in set"),
            }
        }

        let segmentation = match &config.compounds_path {
            Some(path) => match load_word_list(path) {
                Ok(words) => Segmentation::Compound(CompoundSegmenter::new(words)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "compound segmenter unavailable, splitting on whitespace");
                    Segmentation::Whitespace
                }
            },
            None => {
                tracing::info!("no compound list configured, splitting on whitespace");
                Segmentation::Whitespace
            }
        };
        let degraded = matches!(segmentation, Segmentation::Whitespace);

        Self { stopwords, segmentation, min_len: config.min_word_length, max_len: config.max_word_length, degraded }
    }

    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords.extend(words.into_iter().map(|w| fold(w.as_ref())));
        self
    }

    pub fn with_compounds(mut self, segmenter: CompoundSegmenter) -> Self {
        self.segmentation = Segmentation::Compound(segmenter);
        self.degraded = false;
        self
    }

    /// True when multi-word units are not being merged.
    pub fn is_degraded(&self) -> bool { self.degraded }

    pub fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    /// Markup removal, case folding and character filtering, without splitting.
    pub fn clean_text(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let text = HTML_TAGS.replace_all(text, " ");
        let text = fold(&text);
        let text = SPECIAL_CHARS.replace_all(&text, " ");
        let text = NUMBERS.replace_all(&text, " ");
        let text = MULTIPLE_SPACES.replace_all(&text, " ");
        text.trim().to_string()
    }

    /// Terms of `text` in order, duplicates kept.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let cleaned = self.clean_text(text);
        if cleaned.is_empty() {
            return Vec::new();
        }
        let tokens = match &self.segmentation {
            Segmentation::Whitespace => cleaned.split(' ').map(str::to_string).collect(),
            Segmentation::Compound(seg) => seg.segment(&cleaned),
        };
        tokens
            .into_iter()
            .filter(|t| {
                let len = t.chars().count();
                len >= self.min_len && len <= self.max_len
            })
            .filter(|t| !self.is_stopword(t))
            .collect()
    }
}
