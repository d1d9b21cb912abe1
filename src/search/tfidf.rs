//! Sparse lexical vectorization.
//!
//! A TF-IDF vectorizer fitted over the thread corpus: lowercase alphanumeric
//! tokens of at least two characters, smoothed inverse document frequency
//! `ln((1 + n) / (1 + df)) + 1`, and L2-normalized sparse vectors. Queries are
//! transformed with the fitted vocabulary, so out-of-vocabulary terms simply
//! contribute zero weight.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// L2-normalized sparse term-weight vector; term indices sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    terms: Vec<(usize, f32)>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Cosine similarity via a merge-join dot product. Both vectors are
    /// normalized at construction, so the dot product is the cosine.
    pub fn cosine(&self, other: &SparseVector) -> f32 {
        let mut dot = 0.0;
        let (mut i, mut j) = (0, 0);

        while i < self.terms.len() && j < other.terms.len() {
            match self.terms[i].0.cmp(&other.terms[j].0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    dot += self.terms[i].1 * other.terms[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }

        dot
    }
}

/// Term-weighting vectorizer fitted over a document corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Fit vocabulary and inverse document frequencies over the corpus.
    pub fn fit(documents: &[String]) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let mut seen: HashSet<String> = HashSet::new();
            for token in tokenize(document) {
                if seen.insert(token.clone()) {
                    *document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }

        // Sorted term order keeps vocabulary indices deterministic.
        let mut terms: Vec<String> = document_frequency.keys().cloned().collect();
        terms.sort();

        let total_docs = documents.len() as f32;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());

        for (index, term) in terms.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0) as f32;
            idf.push(((1.0 + total_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Self { vocabulary, idf }
    }

    /// Transform text into a normalized sparse vector over the fitted
    /// vocabulary. Unknown terms are dropped.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut terms: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        terms.sort_by_key(|&(index, _)| index);

        let norm = terms.iter().map(|&(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for term in &mut terms {
                term.1 /= norm;
            }
        }

        SparseVector { terms }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lowercase alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(|token| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "the quick brown fox".to_string(),
            "rust borrow checker rules".to_string(),
            "brown bread recipe".to_string(),
        ]
    }

    #[test]
    fn exact_duplicate_of_a_document_scores_highest() {
        let docs = corpus();
        let vectorizer = TfidfVectorizer::fit(&docs);
        let matrix: Vec<SparseVector> = docs.iter().map(|d| vectorizer.transform(d)).collect();

        let query = vectorizer.transform("rust borrow checker rules");
        let scores: Vec<f32> = matrix.iter().map(|doc| query.cosine(doc)).collect();

        assert!((scores[1] - 1.0).abs() < 1e-5);
        assert!(scores[1] > scores[0]);
        assert!(scores[1] > scores[2]);
    }

    #[test]
    fn out_of_vocabulary_query_is_the_zero_vector() {
        let docs = corpus();
        let vectorizer = TfidfVectorizer::fit(&docs);

        let query = vectorizer.transform("zephyr quux");
        assert!(query.is_empty());

        let doc = vectorizer.transform(&docs[0]);
        assert_eq!(query.cosine(&doc), 0.0);
    }

    #[test]
    fn empty_query_is_the_zero_vector() {
        let vectorizer = TfidfVectorizer::fit(&corpus());
        assert!(vectorizer.transform("").is_empty());
    }

    #[test]
    fn shared_terms_yield_positive_similarity() {
        let docs = corpus();
        let vectorizer = TfidfVectorizer::fit(&docs);
        let query = vectorizer.transform("brown");

        let fox = vectorizer.transform(&docs[0]);
        let rust = vectorizer.transform(&docs[1]);

        assert!(query.cosine(&fox) > 0.0);
        assert_eq!(query.cosine(&rust), 0.0);
    }

    #[test]
    fn rare_terms_outweigh_common_ones() {
        let docs = vec![
            "alpha beta".to_string(),
            "alpha gamma".to_string(),
            "alpha delta".to_string(),
        ];
        let vectorizer = TfidfVectorizer::fit(&docs);

        // "beta" appears in one document, "alpha" in all three.
        let query = vectorizer.transform("alpha beta");
        let first = vectorizer.transform(&docs[0]);
        let second = vectorizer.transform(&docs[1]);

        assert!(query.cosine(&first) > query.cosine(&second));
    }

    #[test]
    fn single_character_tokens_are_dropped() {
        let docs = vec!["a b ab".to_string()];
        let vectorizer = TfidfVectorizer::fit(&docs);
        assert_eq!(vectorizer.vocabulary_len(), 1);
    }
}
