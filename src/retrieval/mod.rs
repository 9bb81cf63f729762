pub mod lexical;

pub use lexical::LexicalIndex;

use async_trait::async_trait;

use crate::error::Result;

/// Similarity search over catalog items.
///
/// Returns `(item_id, score)` pairs, best first. Scores are not guaranteed to
/// be normalized; callers clamp them.
#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<(String, f64)>>;
}
