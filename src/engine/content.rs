use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::Product;

/// Term to weight, ordered by term
pub type TermVector = BTreeMap<String, f64>;

/// Vocabulary cap; the most frequent terms across the catalog are kept
pub const MAX_FEATURES: usize = 5000;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "for", "from", "has", "have", "he", "her", "his", "how", "if", "in",
    "into", "is", "it", "its", "more", "most", "my", "no", "not", "of", "on", "one", "or",
    "other", "our", "out", "she", "so", "some", "than", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "to", "up", "was", "we", "were", "what", "when", "which",
    "who", "will", "with", "you", "your",
];

/// A catalog item ranked by description similarity
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub item_id: String,
    pub similarity: f64,
}

/// TF-IDF vectors over product title and description
///
/// Terms are lowercase alphanumeric words of two or more characters, minus
/// common English stop words, plus adjacent word pairs. Weights use the
/// smoothed idf `ln((1 + n) / (1 + df)) + 1` and every vector is L2-normalised,
/// so the dot product of two vectors is their cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    vectors: BTreeMap<String, TermVector>,
}

impl ContentIndex {
    pub fn build(products: &[Product]) -> Self {
        let documents: Vec<(&str, Vec<String>)> = products
            .iter()
            .map(|p| {
                let text = format!("{} {}", p.title, p.description.as_deref().unwrap_or(""));
                (p.item_id.as_str(), terms(&text))
            })
            .collect();

        let vocabulary = vocabulary(documents.iter().map(|(_, t)| t.as_slice()));

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for (_, doc_terms) in &documents {
            let mut seen: Vec<&str> = doc_terms
                .iter()
                .map(String::as_str)
                .filter(|t| vocabulary.contains_key(*t))
                .collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let n = documents.len() as f64;
        let vectors = documents
            .iter()
            .map(|(item_id, doc_terms)| {
                let mut counts: TermVector = BTreeMap::new();
                for term in doc_terms.iter().filter(|t| vocabulary.contains_key(t.as_str())) {
                    *counts.entry(term.clone()).or_default() += 1.0;
                }
                for (term, weight) in counts.iter_mut() {
                    let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
                    *weight *= ((1.0 + n) / (1.0 + df)).ln() + 1.0;
                }
                normalize(&mut counts);
                (item_id.to_string(), counts)
            })
            .collect();

        Self { vectors }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.vectors.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The `k` items most similar to `item_id`, excluding the item itself
    ///
    /// Items sharing no term score 0 and are left out. Ordered by similarity
    /// descending, then item id. `None` when `item_id` is not indexed.
    pub fn most_similar(&self, item_id: &str, k: usize) -> Option<Vec<ContentMatch>> {
        let target = self.vectors.get(item_id)?;

        let mut matches: Vec<ContentMatch> = self
            .vectors
            .iter()
            .filter(|(other, _)| other.as_str() != item_id)
            .map(|(other, vector)| ContentMatch {
                item_id: other.clone(),
                similarity: dot(target, vector),
            })
            .filter(|m| m.similarity > 0.0 && m.similarity.is_finite())
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        matches.truncate(k);

        Some(matches)
    }
}

/// Unigrams and bigrams of the normalised words in `text`
fn terms(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect();

    let bigrams = words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1]));
    words.iter().cloned().chain(bigrams).collect()
}

/// Terms kept in the index: the `MAX_FEATURES` most frequent, ties by term
fn vocabulary<'a>(documents: impl Iterator<Item = &'a [String]>) -> HashMap<String, usize> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for doc_terms in documents {
        for term in doc_terms {
            *frequency.entry(term.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = frequency.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_FEATURES)
        .map(|(term, count)| (term.to_string(), count))
        .collect()
}

fn normalize(vector: &mut TermVector) {
    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        vector.values_mut().for_each(|w| *w /= norm);
    }
}

/// Dot product over shared terms
fn dot(a: &TermVector, b: &TermVector) -> f64 {
    a.iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum()
}
