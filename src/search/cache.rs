//! On-disk cache of built index artifacts.
//!
//! Each artifact is a bincode blob carrying its cache version, written under a
//! versioned filename:
//!
//! - `threads_v1.bin`: the thread set
//! - `tfidf_v1.bin`: fitted vectorizer plus thread matrix (lexical mode)
//! - `embeddings_v1.bin`: one dense vector per thread (semantic mode)
//!
//! A usable cache needs the thread artifact and the active mode's index
//! artifact. Loading is all-or-nothing: missing files, undecodable blobs and
//! version mismatches are all surfaced so callers fall back to a full rebuild.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::threading::ThreadSet;

use super::engine::{LexicalIndex, SemanticIndex};
use super::types::SearchMode;

/// Current cache format version.
const CACHE_VERSION: u32 = 1;

const THREADS_FILE: &str = "threads_v1.bin";
const TFIDF_FILE: &str = "tfidf_v1.bin";
const EMBEDDINGS_FILE: &str = "embeddings_v1.bin";

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache not found")]
    NotFound,
    #[error("cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("IO error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("deserialization error: {0}")]
    Deserialize(String),
}

#[derive(Deserialize)]
struct Stored<T> {
    version: u32,
    payload: T,
}

// Field order mirrors `Stored` so the encodings are interchangeable.
#[derive(Serialize)]
struct StoredRef<'a, T> {
    version: u32,
    payload: &'a T,
}

/// Handle to a cache directory holding serialized index artifacts.
#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether every artifact the given mode needs is present on disk.
    pub fn has_index(&self, mode: SearchMode) -> bool {
        let index_file = match mode {
            SearchMode::Lexical => TFIDF_FILE,
            SearchMode::Semantic => EMBEDDINGS_FILE,
        };
        self.dir.join(THREADS_FILE).exists() && self.dir.join(index_file).exists()
    }

    pub fn load_threads(&self) -> Result<ThreadSet, CacheError> {
        self.load_blob(THREADS_FILE)
    }

    pub fn load_lexical(&self) -> Result<LexicalIndex, CacheError> {
        self.load_blob(TFIDF_FILE)
    }

    pub fn load_semantic(&self) -> Result<SemanticIndex, CacheError> {
        self.load_blob(EMBEDDINGS_FILE)
    }

    pub fn save_threads(&self, threads: &ThreadSet) -> Result<(), CacheError> {
        self.save_blob(THREADS_FILE, threads)
    }

    pub fn save_lexical(&self, index: &LexicalIndex) -> Result<(), CacheError> {
        self.save_blob(TFIDF_FILE, index)
    }

    pub fn save_semantic(&self, index: &SemanticIndex) -> Result<(), CacheError> {
        self.save_blob(EMBEDDINGS_FILE, index)
    }

    /// Delete the cache directory and everything in it.
    pub fn reset(&self) -> Result<(), CacheError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|err| CacheError::Io(err.to_string()))?;
            log::info!("deleted cache directory {}", self.dir.display());
        }
        Ok(())
    }

    fn load_blob<T: DeserializeOwned>(&self, file: &str) -> Result<T, CacheError> {
        let path = self.dir.join(file);

        if !path.exists() {
            return Err(CacheError::NotFound);
        }

        let data = fs::read(&path).map_err(|err| CacheError::Io(err.to_string()))?;
        let stored: Stored<T> = bincode::deserialize(&data)
            .map_err(|err| CacheError::Deserialize(err.to_string()))?;

        if stored.version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch {
                expected: CACHE_VERSION,
                found: stored.version,
            });
        }

        log::debug!("loaded cache artifact {} ({} bytes)", file, data.len());
        Ok(stored.payload)
    }

    fn save_blob<T: Serialize>(&self, file: &str, payload: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|err| CacheError::Io(err.to_string()))?;

        let stored = StoredRef {
            version: CACHE_VERSION,
            payload,
        };
        let data =
            bincode::serialize(&stored).map_err(|err| CacheError::Serialize(err.to_string()))?;

        let path = self.dir.join(file);
        fs::write(&path, &data).map_err(|err| CacheError::Io(err.to_string()))?;

        log::debug!("saved cache artifact {} ({} bytes)", file, data.len());
        Ok(())
    }
}
