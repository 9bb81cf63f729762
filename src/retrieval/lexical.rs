//! In-memory TF-IDF cosine index over market text.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::RetrievalIndex;
use crate::domain::{Event, Market};
use crate::error::Result;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "before", "by", "did", "do", "does", "for",
    "from", "has", "have", "if", "in", "into", "is", "it", "its", "of", "on", "or", "than",
    "that", "the", "their", "this", "to", "was", "were", "what", "when", "which", "who", "will",
    "with", "would", "market", "resolve", "resolves", "yes", "no",
];

/// Lowercased alphanumeric tokens with stopwords and single letters removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn term_counts(tokens: &[String]) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    counts
}

#[derive(Debug, Clone)]
struct Document {
    id: String,
    /// Unit-length tf-idf vector
    weights: HashMap<String, f64>,
}

/// Bag-of-words index keyed by market id.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    docs: Vec<Document>,
    idf: HashMap<String, f64>,
}

impl LexicalIndex {
    /// Index `(id, text)` pairs
    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (String, S)>,
        S: AsRef<str>,
    {
        let raw: Vec<(String, HashMap<String, f64>)> = documents
            .into_iter()
            .map(|(id, text)| (id, term_counts(&tokenize(text.as_ref()))))
            .collect();

        let mut df: HashMap<&str, usize> = HashMap::new();
        for (_, counts) in &raw {
            for term in counts.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = raw.len() as f64;
        let idf: HashMap<String, f64> = df
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0))
            .collect();

        let docs = raw
            .into_iter()
            .map(|(id, counts)| Document {
                id,
                weights: normalize(weigh(counts, &idf)),
            })
            .collect();

        Self { docs, idf }
    }

    /// Index every market of the snapshot; text is event title, question and description.
    pub fn from_catalog(events: &[Event], markets: &[Market]) -> Self {
        let titles: HashMap<&str, &str> =
            events.iter().map(|e| (e.id.as_str(), e.title.as_str())).collect();

        Self::from_documents(markets.iter().map(|m| {
            let title = titles.get(m.event_id.as_str()).copied().unwrap_or_default();
            (m.id.clone(), format!("{} {} {}", title, m.question, m.description))
        }))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Cosine scores in [0, 1], best first, ties by id
    pub fn search(&self, text: &str, top_k: usize) -> Vec<(String, f64)> {
        let query = normalize(weigh(term_counts(&tokenize(text)), &self.idf));
        if query.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut hits: Vec<(String, f64)> = self
            .docs
            .iter()
            .filter(|doc| seen.insert(doc.id.as_str()))
            .map(|doc| {
                let score: f64 = query
                    .iter()
                    .filter_map(|(term, w)| doc.weights.get(term).map(|d| w * d))
                    .sum();
                (doc.id.clone(), score.clamp(0.0, 1.0))
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        hits.truncate(top_k);
        hits
    }
}

/// Terms unknown to the corpus get zero weight
fn weigh(counts: HashMap<String, f64>, idf: &HashMap<String, f64>) -> HashMap<String, f64> {
    counts
        .into_iter()
        .filter_map(|(term, tf)| idf.get(&term).map(|idf| (term, tf * idf)))
        .collect()
}

fn normalize(mut weights: HashMap<String, f64>) -> HashMap<String, f64> {
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
        return HashMap::new();
    }
    weights.values_mut().for_each(|w| *w /= norm);
    weights
}

#[async_trait]
impl RetrievalIndex for LexicalIndex {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<(String, f64)>> {
        Ok(self.search(text, top_k))
    }
}
