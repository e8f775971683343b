use crate::config::SearchConfig;
use crate::document::{DocId, Document, Field};
use crate::lexical::{self, Page, ScoredDocument};
use crate::store::RecordStore;

/// Query surface handed to the front end. No method returns an error: store
/// failures are logged and answered with an empty result.
pub struct SearchService<S> {
    store: S,
    config: SearchConfig,
}

impl<S: RecordStore> SearchService<S> {
    pub fn new(store: S, config: SearchConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SearchConfig { &self.config }

    fn scan(&self, op: &str) -> Option<Vec<Document>> {
        match self.store.scan() {
            Ok(docs) => Some(docs),
            Err(e) => {
                tracing::error!(op, error = %format!("{e:#}"), "record store scan failed");
                None
            }
        }
    }

    /// One page of lexical matches with the configured page size.
    pub fn search(&self, query: &str, page: usize) -> Page<ScoredDocument> {
        self.search_page(query, page, self.config.results_per_page)
    }

    pub fn search_page(&self, query: &str, page: usize, per_page: usize) -> Page<ScoredDocument> {
        if query.trim().is_empty() {
            return Page::default();
        }
        let Some(docs) = self.scan("search") else { return Page::default() };
        let page = lexical::paginate(lexical::match_documents(query, docs), page, per_page);
        tracing::info!(%query, total = page.total, "search");
        page
    }

    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        if prefix.trim().chars().count() < self.config.min_suggestion_len {
            return Vec::new();
        }
        self.scan("suggest").map(|docs| lexical::suggest(prefix.trim(), &docs, limit)).unwrap_or_default()
    }

    pub fn popular(&self, limit: usize) -> Vec<Document> {
        self.scan("popular").map(|docs| lexical::popular(docs, limit)).unwrap_or_default()
    }

    pub fn by_field(&self, field: Field, value: &str, limit: usize) -> Vec<Document> {
        self.scan("by_field").map(|docs| lexical::by_field(field, value, docs, limit)).unwrap_or_default()
    }

    pub fn by_genre(&self, genre: &str, limit: usize) -> Vec<Document> {
        self.by_field(Field::Genre, genre, limit)
    }

    pub fn get(&self, id: DocId) -> Option<Document> {
        match self.store.get(id) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(id, error = %format!("{e:#}"), "record lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use anyhow::{anyhow, Result};

    struct Broken;

    impl RecordStore for Broken {
        fn scan(&self) -> Result<Vec<Document>> { Err(anyhow!("connection refused")) }
        fn get(&self, _id: DocId) -> Result<Option<Document>> { Err(anyhow!("connection refused")) }
    }

    #[test]
    fn failures_degrade_to_empty() {
        let svc = SearchService::new(Broken, SearchConfig::default());
        assert_eq!(svc.search("mai", 1), Page::default());
        assert!(svc.suggest("mai", 5).is_empty());
        assert!(svc.popular(5).is_empty());
        assert!(svc.by_genre("hài", 5).is_empty());
        assert!(svc.get(1).is_none());
    }

    #[test]
    fn pages_through_matches() {
        let store: MemoryStore = (1..=25)
            .map(|i| Document { genre: Some("Hành động".into()), year: Some(2000 + i as i32), ..Document::new(i, format!("Phim {i}")) })
            .collect();
        let svc = SearchService::new(store, SearchConfig::default());
        let page = svc.search("hành động", 2);
        assert_eq!(page.total, 25);
        let ids: Vec<DocId> = page.items.iter().map(|r| r.document.id).collect();
        assert_eq!(ids, (6..=15).rev().collect::<Vec<_>>());
    }

    #[test]
    fn short_prefixes_get_no_suggestions() {
        let store: MemoryStore = [Document::new(1, "Mai")].into_iter().collect();
        let svc = SearchService::new(store, SearchConfig::default());
        assert!(svc.suggest("m", 5).is_empty());
        assert_eq!(svc.suggest("ma", 5), vec!["Mai".to_string()]);
    }
}
