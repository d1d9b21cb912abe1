use super::SearchMode;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env_string(key, default))
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .map(|value| value.clamp(0.0, 1.0))
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

/// Runtime configuration for ingest, indexing and search behavior.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub export_path: PathBuf,
    pub cache_dir: PathBuf,
    pub mode: SearchMode,
    pub top_k: usize,
    pub semantic_threshold: f32,
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            export_path: env_path("CHAT_EXPORT_PATH", "./statics/result.json"),
            cache_dir: env_path("SEARCH_CACHE_DIR", "./cache"),
            mode: env::var("SEARCH_DEFAULT_MODE")
                .ok()
                .and_then(|value| SearchMode::from_str(&value).ok())
                .unwrap_or_default(),
            top_k: env_usize("SEARCH_TOP_K", 3).max(1),
            semantic_threshold: env_f32("SEARCH_SEMANTIC_THRESHOLD", 0.3),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Configuration for the embeddings service client.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model_id: String,
    pub dimension: usize,
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub document_prefix: String,
    pub query_prefix: String,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("EMBEDDINGS_URL", "http://localhost:8080"),
            model_id: env_string(
                "EMBEDDINGS_MODEL_ID",
                "sentence-transformers/all-MiniLM-L6-v2",
            ),
            dimension: env_usize("EMBEDDINGS_DIM", 384),
            batch_size: env_usize("EMBEDDINGS_BATCH_SIZE", 32),
            request_timeout: env_duration_millis("EMBEDDINGS_TIMEOUT_MS", 30_000),
            document_prefix: env_string("SEARCH_DOCUMENT_PREFIX", ""),
            query_prefix: env_string("SEARCH_QUERY_PREFIX", ""),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
