use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::document::{DocId, Document};

/// Read side of the movie record store.
///
/// Every search and every ground-truth build scans the full store.
pub trait RecordStore {
    /// All records, ascending by id.
    fn scan(&self) -> Result<Vec<Document>>;

    fn get(&self, id: DocId) -> Result<Option<Document>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn scan(&self) -> Result<Vec<Document>> { (**self).scan() }
    fn get(&self, id: DocId) -> Result<Option<Document>> { (**self).get(id) }
}

/// In-process store, handy for tests and small embedded corpora.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: BTreeMap<DocId, Document>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, doc: Document) {
        self.docs.insert(doc.id, doc);
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
}

impl FromIterator<Document> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self { docs: iter.into_iter().map(|d| (d.id, d)).collect() }
    }
}

impl RecordStore for MemoryStore {
    fn scan(&self) -> Result<Vec<Document>> {
        Ok(self.docs.values().cloned().collect())
    }

    fn get(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.docs.get(&id).cloned())
    }
}

const MOVIES_TREE: &str = "movies";

/// sled-backed store. Keys are big-endian ids so iteration is ascending;
/// values are JSON documents.
pub struct SledStore {
    db: sled::Db,
    movies: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).with_context(|| format!("opening record store at {}", path.display()))?;
        let movies = db.open_tree(MOVIES_TREE)?;
        Ok(Self { db, movies })
    }

    /// Insert or replace a record.
    pub fn insert(&self, doc: &Document) -> Result<()> {
        let value = serde_json::to_vec(doc)?;
        self.movies.insert(doc.id.to_be_bytes(), value)?;
        Ok(())
    }

    pub fn len(&self) -> usize { self.movies.len() }

    pub fn is_empty(&self) -> bool { self.movies.is_empty() }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Import one record per line. Malformed lines are skipped.
    pub fn import_jsonl(&self, file: &Path) -> Result<usize> {
        let reader = BufReader::new(File::open(file)?);
        let mut imported = 0;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            match serde_json::from_str::<Document>(&line) {
                Ok(doc) => {
                    self.insert(&doc)?;
                    imported += 1;
                }
                Err(e) => tracing::warn!(file = %file.display(), line = lineno + 1, error = %e, "skipping malformed record"),
            }
        }
        Ok(imported)
    }

    /// Import a JSON array of records, or a single record object.
    pub fn import_json(&self, file: &Path) -> Result<usize> {
        let reader = BufReader::new(File::open(file)?);
        let json: serde_json::Value = serde_json::from_reader(reader)
            .with_context(|| format!("parsing {}", file.display()))?;
        let values = match json {
            serde_json::Value::Array(arr) => arr,
            v @ serde_json::Value::Object(_) => vec![v],
            _ => Vec::new(),
        };
        let mut imported = 0;
        for (i, v) in values.into_iter().enumerate() {
            match serde_json::from_value::<Document>(v) {
                Ok(doc) => {
                    self.insert(&doc)?;
                    imported += 1;
                }
                Err(e) => tracing::warn!(file = %file.display(), entry = i, error = %e, "skipping malformed record"),
            }
        }
        Ok(imported)
    }
}

fn decode_key(key: &[u8]) -> Option<DocId> {
    let bytes: [u8; 4] = key.try_into().ok()?;
    Some(DocId::from_be_bytes(bytes))
}

impl RecordStore for SledStore {
    fn scan(&self) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(self.movies.len());
        for entry in self.movies.iter() {
            let (key, value) = entry.context("reading record store")?;
            match serde_json::from_slice::<Document>(&value) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(key = ?decode_key(&key), error = %e, "skipping undecodable record"),
            }
        }
        Ok(docs)
    }

    fn get(&self, id: DocId) -> Result<Option<Document>> {
        match self.movies.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn sled_scan_is_ascending_and_skips_garbage() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        store.insert(&Document::new(300, "C")).unwrap();
        store.insert(&Document::new(2, "A")).unwrap();
        store.insert(&Document::new(17, "B")).unwrap();
        store.movies.insert(5u32.to_be_bytes(), b"not json".to_vec()).unwrap();

        let ids: Vec<DocId> = store.scan().unwrap().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 17, 300]);
        assert_eq!(store.get(17).unwrap().unwrap().title, "B");
        assert!(store.get(99).unwrap().is_none());
    }

    #[test]
    fn jsonl_import_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movies.jsonl");
        let mut f = File::create(&path).unwrap();
        writeln!(f, r#"{{"id":1,"title":"Mai","genre":"Tâm lý"}}"#).unwrap();
        writeln!(f, "{{broken").unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"id":2,"title":"Lật mặt 7","year":2024}}"#).unwrap();
        drop(f);

        let store = SledStore::open(dir.path().join("db")).unwrap();
        assert_eq!(store.import_jsonl(&path).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }
}
