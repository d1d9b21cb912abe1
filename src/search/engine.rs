//! The search engine facade.
//!
//! Holds the thread set plus the built index state for the active
//! [`SearchMode`] and answers ranked queries. Both variants share the same
//! contract: `build` fits or encodes one document per thread, `search` ranks
//! threads by cosine similarity against the query, keeps the top-k above the
//! acceptance bar (similarity > 0 for lexical, > the configured threshold for
//! semantic), and surfaces the best-matching member message of each surviving
//! thread. Searching before `build` or a cache load is an explicit error.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{self, IngestError};
use crate::models::{Message, SearchHit};
use crate::threading::{self, Thread, ThreadSet, ThreadingError};

use super::cache::{CacheError, IndexCache};
use super::config::SearchConfig;
use super::embedding::{EmbeddingClient, EmbeddingError, EncodeKind};
use super::tfidf::{SparseVector, TfidfVectorizer};
use super::types::SearchMode;

/// Errors raised while answering a query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search index has not been built or loaded yet")]
    IndexNotReady,
    #[error("semantic search requires an embeddings client")]
    EmbeddingUnavailable,
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Errors raised while constructing an engine from the export and cache.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Threading(#[from] ThreadingError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Fitted lexical artifacts: the vectorizer plus one sparse vector per thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalIndex {
    pub vectorizer: TfidfVectorizer,
    pub matrix: Vec<SparseVector>,
}

/// Dense artifacts: one normalized embedding per thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticIndex {
    pub embeddings: Vec<Vec<f32>>,
}

enum IndexState {
    Empty,
    Lexical(LexicalIndex),
    Semantic(SemanticIndex),
}

pub struct SearchEngine {
    mode: SearchMode,
    semantic_threshold: f32,
    threads: ThreadSet,
    state: IndexState,
    embeddings: Option<EmbeddingClient>,
}

impl SearchEngine {
    pub fn new(
        mode: SearchMode,
        semantic_threshold: f32,
        embeddings: Option<EmbeddingClient>,
    ) -> Self {
        Self {
            mode,
            semantic_threshold,
            threads: ThreadSet::default(),
            state: IndexState::Empty,
            embeddings,
        }
    }

    /// Open a cached index if every expected artifact is usable, otherwise
    /// ingest the export, thread it, build the index and persist it.
    pub async fn open_or_build(
        config: &SearchConfig,
        embeddings: Option<EmbeddingClient>,
    ) -> Result<Self, SetupError> {
        let cache = IndexCache::new(&config.cache_dir);
        let mut engine = Self::new(config.mode, config.semantic_threshold, embeddings);

        match engine.load_cached(&cache) {
            Ok(()) => {
                log::info!(
                    "loaded search index from cache ({} threads, {} mode)",
                    engine.threads.len(),
                    engine.mode
                );
            }
            Err(CacheError::NotFound) => {
                log::info!("no cached index found, building a new one");
                engine.build_from_export(config, &cache).await?;
            }
            Err(err) => {
                log::warn!("cached index unusable ({err}), rebuilding");
                engine.build_from_export(config, &cache).await?;
            }
        }

        Ok(engine)
    }

    /// Delete the cache and rebuild the index from the export.
    pub async fn rebuild(&mut self, config: &SearchConfig) -> Result<(), SetupError> {
        let cache = IndexCache::new(&config.cache_dir);
        cache.reset()?;
        self.state = IndexState::Empty;
        self.build_from_export(config, &cache).await
    }

    async fn build_from_export(
        &mut self,
        config: &SearchConfig,
        cache: &IndexCache,
    ) -> Result<(), SetupError> {
        let export = ingest::load_export(&config.export_path)?;
        log::info!(
            "loaded {} messages from {}",
            export.messages.len(),
            config.export_path.display()
        );

        let threads = threading::build_threads(&export.messages)?;
        log::info!("grouped messages into {} threads", threads.len());

        self.build(threads).await?;
        self.persist(cache)?;
        log::info!("new index built and cached");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        !matches!(self.state, IndexState::Empty)
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn threads(&self) -> &ThreadSet {
        &self.threads
    }

    /// Restore threads and index state from cached artifacts. All-or-nothing:
    /// any missing or unreadable artifact leaves the engine untouched.
    pub fn load_cached(&mut self, cache: &IndexCache) -> Result<(), CacheError> {
        let threads = cache.load_threads()?;
        let state = match self.mode {
            SearchMode::Lexical => IndexState::Lexical(cache.load_lexical()?),
            SearchMode::Semantic => IndexState::Semantic(cache.load_semantic()?),
        };

        self.threads = threads;
        self.state = state;
        Ok(())
    }

    /// Persist the built artifacts. A no-op for an empty engine.
    pub fn persist(&self, cache: &IndexCache) -> Result<(), CacheError> {
        match &self.state {
            IndexState::Empty => Ok(()),
            IndexState::Lexical(index) => {
                cache.save_threads(&self.threads)?;
                cache.save_lexical(index)
            }
            IndexState::Semantic(index) => {
                cache.save_threads(&self.threads)?;
                cache.save_semantic(index)
            }
        }
    }

    /// Build the index for the active mode over the given threads.
    pub async fn build(&mut self, threads: ThreadSet) -> Result<(), SearchError> {
        match self.mode {
            SearchMode::Lexical => self.build_lexical(threads),
            SearchMode::Semantic => self.build_semantic(threads).await?,
        }
        Ok(())
    }

    /// Fit the TF-IDF vectorizer and thread matrix; no I/O involved.
    pub fn build_lexical(&mut self, threads: ThreadSet) {
        let texts: Vec<String> = threads.iter().map(Thread::joined_text).collect();
        let vectorizer = TfidfVectorizer::fit(&texts);
        let matrix = texts
            .iter()
            .map(|text| vectorizer.transform(text))
            .collect();

        log::debug!(
            "fitted lexical index: {} threads, {} terms",
            threads.len(),
            vectorizer.vocabulary_len()
        );

        self.threads = threads;
        self.state = IndexState::Lexical(LexicalIndex { vectorizer, matrix });
    }

    async fn build_semantic(&mut self, threads: ThreadSet) -> Result<(), SearchError> {
        let client = self.embedding_client()?;
        let texts: Vec<String> = threads.iter().map(Thread::joined_text).collect();
        let embeddings = client.encode(EncodeKind::Document, &texts).await?;

        log::debug!("encoded semantic index: {} threads", threads.len());

        self.threads = threads;
        self.state = IndexState::Semantic(SemanticIndex { embeddings });
        Ok(())
    }

    /// Rank threads against the query and return the best member message of
    /// each of the top-k threads that cleared the acceptance bar.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        match &self.state {
            IndexState::Empty => Err(SearchError::IndexNotReady),
            IndexState::Lexical(index) => Ok(self.search_lexical(index, query, k)),
            IndexState::Semantic(index) => self.search_semantic(index, query, k).await,
        }
    }

    fn search_lexical(&self, index: &LexicalIndex, query: &str, k: usize) -> Vec<SearchHit> {
        let query_vec = index.vectorizer.transform(query);
        let scores: Vec<f32> = index
            .matrix
            .iter()
            .map(|doc| query_vec.cosine(doc))
            .collect();

        let mut hits = Vec::new();
        for (thread_index, _) in top_k(&scores, k, |score| score > 0.0) {
            let Some(thread) = self.threads.thread_at(thread_index) else {
                continue;
            };
            if let Some(best) = best_lexical_message(&index.vectorizer, &query_vec, thread) {
                hits.push(SearchHit::from_message(best));
            }
        }
        hits
    }

    async fn search_semantic(
        &self,
        index: &SemanticIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let client = self.embedding_client()?;
        let query_vec = client.encode_one(EncodeKind::Query, query).await?;
        let scores: Vec<f32> = index
            .embeddings
            .iter()
            .map(|embedding| dense_cosine(&query_vec, embedding))
            .collect();

        let threshold = self.semantic_threshold;
        let mut hits = Vec::new();
        for (thread_index, _) in top_k(&scores, k, |score| score > threshold) {
            let Some(thread) = self.threads.thread_at(thread_index) else {
                continue;
            };

            let texts: Vec<String> = thread
                .messages
                .iter()
                .map(|message| message.text.clone())
                .collect();
            let member_vecs = client.encode(EncodeKind::Document, &texts).await?;

            let best = thread
                .messages
                .iter()
                .zip(member_vecs.iter())
                .map(|(message, vec)| (message, dense_cosine(&query_vec, vec)))
                .fold(None, keep_best);

            if let Some((message, _)) = best {
                hits.push(SearchHit::from_message(message));
            }
        }
        Ok(hits)
    }

    fn embedding_client(&self) -> Result<&EmbeddingClient, SearchError> {
        self.embeddings
            .as_ref()
            .ok_or(SearchError::EmbeddingUnavailable)
    }
}

/// Indices of the k highest scores, descending, ties broken by original
/// position, filtered to scores the acceptance bar admits.
fn top_k(scores: &[f32], k: usize, above_bar: impl Fn(f32) -> bool) -> Vec<(usize, f32)> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    order.truncate(k);

    order
        .into_iter()
        .filter(|&index| above_bar(scores[index]))
        .map(|index| (index, scores[index]))
        .collect()
}

/// The member message most similar to the query; first member wins ties.
fn best_lexical_message<'a>(
    vectorizer: &TfidfVectorizer,
    query_vec: &SparseVector,
    thread: &'a Thread,
) -> Option<&'a Message> {
    thread
        .messages
        .iter()
        .map(|message| {
            let score = query_vec.cosine(&vectorizer.transform(&message.text));
            (message, score)
        })
        .fold(None, keep_best)
        .map(|(message, _)| message)
}

fn keep_best<'a>(
    acc: Option<(&'a Message, f32)>,
    candidate: (&'a Message, f32),
) -> Option<(&'a Message, f32)> {
    match acc {
        Some((_, best)) if best >= candidate.1 => acc,
        _ => Some(candidate),
    }
}

fn dense_cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threading::build_threads;

    fn message(id: i64, reply_to: Option<i64>, text: &str) -> Message {
        Message {
            id,
            text: text.to_string(),
            reply_to,
            from: format!("user{id}"),
            date: "2024-01-01T00:00:00".to_string(),
        }
    }

    fn sample_threads() -> ThreadSet {
        let messages = vec![
            message(1, None, "how do lifetimes work in rust"),
            message(2, Some(1), "lifetimes annotate how long references live"),
            message(3, None, "anyone up for pizza tonight"),
            message(4, Some(3), "pizza sounds great, eight o'clock"),
            message(5, None, "the deployment pipeline is broken again"),
        ];
        build_threads(&messages).expect("acyclic sample")
    }

    fn lexical_engine() -> SearchEngine {
        let mut engine = SearchEngine::new(SearchMode::Lexical, 0.3, None);
        engine.build_lexical(sample_threads());
        engine
    }

    #[tokio::test]
    async fn search_before_build_fails_with_not_ready() {
        let engine = SearchEngine::new(SearchMode::Lexical, 0.3, None);
        let err = engine.search("anything", 3).await.unwrap_err();
        assert!(matches!(err, SearchError::IndexNotReady));
    }

    #[tokio::test]
    async fn duplicate_of_root_text_ranks_its_thread_first() {
        let engine = lexical_engine();
        let hits = engine
            .search("how do lifetimes work in rust", 3)
            .await
            .expect("ready");

        assert!(!hits.is_empty());
        assert_eq!(hits[0].message_id, 1);
    }

    #[tokio::test]
    async fn best_member_message_is_surfaced() {
        let engine = lexical_engine();
        let hits = engine
            .search("references live", 1)
            .await
            .expect("ready");

        assert_eq!(hits.len(), 1);
        // The reply, not the thread root, matches the query best.
        assert_eq!(hits[0].message_id, 2);
        assert_eq!(hits[0].sender, "user2");
    }

    #[tokio::test]
    async fn zero_similarity_results_are_dropped() {
        let engine = lexical_engine();
        let hits = engine
            .search("completely unrelated zebra talk", 5)
            .await
            .expect("ready");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn empty_query_returns_no_results() {
        let engine = lexical_engine();
        let hits = engine.search("", 5).await.expect("ready");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn k_larger_than_thread_count_yields_at_most_one_hit_per_thread() {
        let engine = lexical_engine();
        let hits = engine.search("pizza rust deployment", 50).await.expect("ready");

        assert!(hits.len() <= engine.threads().len());
        let mut ids: Vec<i64> = hits.iter().map(|hit| hit.message_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), hits.len());
    }

    #[tokio::test]
    async fn k_caps_the_result_count() {
        let engine = lexical_engine();
        let hits = engine.search("pizza rust deployment", 1).await.expect("ready");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn top_k_breaks_ties_by_original_order() {
        let scores = vec![0.5, 0.9, 0.5, 0.1];
        let picked = top_k(&scores, 3, |s| s > 0.0);
        let indices: Vec<usize> = picked.iter().map(|&(i, _)| i).collect();
        assert_eq!(indices, vec![1, 0, 2]);
    }

    #[test]
    fn top_k_applies_bar_after_truncation() {
        let scores = vec![0.0, 0.0, 0.7];
        let picked = top_k(&scores, 2, |s| s > 0.0);
        let indices: Vec<usize> = picked.iter().map(|&(i, _)| i).collect();
        assert_eq!(indices, vec![2]);
    }

    #[test]
    fn dense_cosine_handles_degenerate_inputs() {
        assert_eq!(dense_cosine(&[], &[]), 0.0);
        assert_eq!(dense_cosine(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(dense_cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((dense_cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn save_then_load_reproduces_identical_results() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = IndexCache::new(dir.path());

        let engine = lexical_engine();
        engine.persist(&cache).expect("persist");

        let mut restored = SearchEngine::new(SearchMode::Lexical, 0.3, None);
        restored.load_cached(&cache).expect("load");
        assert!(restored.is_ready());

        let query = "how do lifetimes work in rust";
        let original_hits = engine.search(query, 3).await.expect("ready");
        let restored_hits = restored.search(query, 3).await.expect("ready");
        assert_eq!(original_hits, restored_hits);
    }

    #[tokio::test]
    async fn semantic_mode_without_client_is_an_error() {
        let mut engine = SearchEngine::new(SearchMode::Semantic, 0.3, None);
        let err = engine.build(sample_threads()).await.unwrap_err();
        assert!(matches!(err, SearchError::EmbeddingUnavailable));
    }
}
