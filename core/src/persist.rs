use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};

use crate::InvertedIndex;

pub const SNAPSHOT_VERSION: u32 = 1;
const SNAPSHOT_MAGIC: &[u8; 4] = b"CIX1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn snapshot(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn snapshot_tmp(&self) -> PathBuf { self.root.join("index.bin.tmp") }
}

/// Serialize the whole index. Layout: `[bincode payload][magic][crc32 BE]`.
pub fn encode_snapshot(index: &InvertedIndex) -> Result<Vec<u8>> {
    let payload = bincode::serialize(index)?;
    let crc = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&payload);
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.extend_from_slice(&crc.to_be_bytes());
    Ok(out)
}

pub fn decode_snapshot(raw: &[u8]) -> Result<InvertedIndex> {
    if raw.len() < 8 {
        bail!("snapshot truncated ({} bytes)", raw.len());
    }
    let (payload, footer) = raw.split_at(raw.len() - 8);
    if &footer[..4] != SNAPSHOT_MAGIC {
        bail!("snapshot footer missing");
    }
    let stored = u32::from_be_bytes([footer[4], footer[5], footer[6], footer[7]]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        bail!("snapshot crc mismatch: stored {stored:#010x}, computed {computed:#010x}");
    }
    Ok(bincode::deserialize(payload)?)
}

pub fn save_snapshot(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = encode_snapshot(index)?;
    fs::write(paths.snapshot_tmp(), &bytes)?;
    fs::rename(paths.snapshot_tmp(), paths.snapshot())?;
    tracing::info!(path = %paths.snapshot().display(), bytes = bytes.len(), "saved index snapshot");
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<InvertedIndex> {
    let raw = fs::read(paths.snapshot()).with_context(|| format!("reading {}", paths.snapshot().display()))?;
    decode_snapshot(&raw).with_context(|| format!("decoding {}", paths.snapshot().display()))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(paths.meta(), json)?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let buf = fs::read_to_string(paths.meta())?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn meta_for(index: &InvertedIndex) -> MetaFile {
    MetaFile {
        num_docs: index.num_docs(),
        num_terms: index.vocabulary_len(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: SNAPSHOT_VERSION,
    }
}

/// Write snapshot and metadata side by side.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    save_snapshot(paths, index)?;
    save_meta(paths, &meta_for(index))
}

/// Load a snapshot written by [`save_index`], rejecting unknown format versions.
pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths).context("reading index metadata")?;
    if meta.version != SNAPSHOT_VERSION {
        bail!("unsupported snapshot version {} (expected {SNAPSHOT_VERSION})", meta.version);
    }
    load_snapshot(paths)
}
