use std::fmt;
use std::str::FromStr;

/// Relevance index variants supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Sparse TF-IDF term vectors with cosine ranking.
    Lexical,
    /// Dense sentence embeddings with cosine ranking.
    Semantic,
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Lexical
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::Lexical => "lexical",
            SearchMode::Semantic => "semantic",
        })
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" | "" => Ok(SearchMode::Lexical),
            "semantic" => Ok(SearchMode::Semantic),
            other => Err(format!("invalid search mode '{other}'")),
        }
    }
}
