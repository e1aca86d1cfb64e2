use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// English stop words dropped before ngram extraction.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "do", "does", "for", "from", "had", "has", "have", "how", "if",
    "in", "into", "is", "it", "its", "may", "might", "more", "most", "no",
    "not", "of", "on", "or", "our", "should", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "through", "to", "too", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "will", "with", "would", "you", "your",
];

/// Term-weighted vector space over short activity descriptions: unigrams and
/// bigrams, stop words removed, vocabulary capped by corpus frequency,
/// smoothed idf, L2-normalized rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Fits the vocabulary and idf weights, returning one vector per document.
    /// Input documents are expected to be pre-normalized text.
    pub fn fit_transform(&mut self, documents: &[String]) -> Vec<DVector<f32>> {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| Self::ngrams(d)).collect();

        // Corpus-wide term counts decide which terms survive the cap;
        // document frequency feeds the idf.
        let mut corpus_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_frequency: HashMap<String, usize> = HashMap::new();

        for tokens in &tokenized {
            let mut seen: HashMap<&str, ()> = HashMap::new();
            for token in tokens {
                *corpus_counts.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token, ()).is_none() {
                    *doc_frequency.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(String, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        self.vocabulary = ranked
            .iter()
            .enumerate()
            .map(|(i, (term, _))| (term.clone(), i))
            .collect();

        let n_docs = documents.len() as f32;
        let mut idf = vec![0.0f32; self.vocabulary.len()];
        for (term, &index) in &self.vocabulary {
            let df = doc_frequency.get(term).copied().unwrap_or(0) as f32;
            idf[index] = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;
        }
        self.idf = idf;

        tokenized
            .iter()
            .map(|tokens| self.vectorize(tokens))
            .collect()
    }

    /// Projects a new document into the fitted space. Out-of-vocabulary
    /// terms contribute nothing.
    pub fn transform(&self, document: &str) -> DVector<f32> {
        self.vectorize(&Self::ngrams(document))
    }

    fn vectorize(&self, tokens: &[String]) -> DVector<f32> {
        let mut vector = DVector::zeros(self.vocabulary.len());
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                vector[index] += self.idf[index];
            }
        }
        let norm = vector.norm();
        if norm > 0.0 {
            vector /= norm;
        }
        vector
    }

    /// Unigrams and bigrams over whitespace tokens, stop words and single
    /// characters removed first.
    fn ngrams(document: &str) -> Vec<String> {
        let words: Vec<&str> = document
            .split_whitespace()
            .filter(|w| w.len() > 1 && !STOP_WORDS.contains(w))
            .collect();

        let mut tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        for pair in words.windows(2) {
            tokens.push(format!("{} {}", pair[0], pair[1]));
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::cosine_similarity;

    fn corpus() -> Vec<String> {
        vec![
            "deep breathing reduces anxiety promotes relaxation".to_string(),
            "gratitude journaling reduces depression improves mood".to_string(),
            "dance movement boosts mood increases energy".to_string(),
        ]
    }

    #[test]
    fn test_fit_transform_shapes() {
        let mut vectorizer = TfidfVectorizer::new(500);
        let matrix = vectorizer.fit_transform(&corpus());
        assert_eq!(matrix.len(), 3);
        assert!(vectorizer.vocabulary_len() > 0);
        assert!(vectorizer.vocabulary_len() <= 500);
        for row in &matrix {
            assert!((row.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_query_matches_most_similar_document() {
        let mut vectorizer = TfidfVectorizer::new(500);
        let matrix = vectorizer.fit_transform(&corpus());

        let query = vectorizer.transform("anxiety relaxation breathing");
        let scores: Vec<f32> = matrix
            .iter()
            .map(|row| cosine_similarity(query.as_slice(), row.as_slice()))
            .collect();

        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
    }

    #[test]
    fn test_vocabulary_cap() {
        let mut vectorizer = TfidfVectorizer::new(4);
        vectorizer.fit_transform(&corpus());
        assert_eq!(vectorizer.vocabulary_len(), 4);
    }

    #[test]
    fn test_out_of_vocabulary_query_is_zero() {
        let mut vectorizer = TfidfVectorizer::new(500);
        vectorizer.fit_transform(&corpus());
        let query = vectorizer.transform("zzz qqq");
        assert_eq!(query.norm(), 0.0);
    }
}
