use crate::error::DimensionMismatch;
use crate::models::{ScoredCandidate, StoredCandidate};
use tracing::debug;

/// Cosine similarity between two vectors. Returns 0 when either vector has
/// zero magnitude; fails only when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, DimensionMismatch> {
    if a.len() != b.len() {
        return Err(DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;

    for (left, right) in a.iter().zip(b.iter()) {
        let left = f64::from(*left);
        let right = f64::from(*right);
        dot += left * right;
        norm_a += left * left;
        norm_b += right * right;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / magnitude)
}

/// Scores every candidate against the query vector, drops those strictly
/// below `threshold`, and returns the best `top_k` in descending order.
/// Ties keep the original candidate order. Backend-computed similarities
/// are ignored; the score is always recomputed locally.
pub fn rank(
    query_vector: &[f32],
    candidates: &[StoredCandidate],
    threshold: f64,
    top_k: usize,
) -> Result<Vec<ScoredCandidate>, DimensionMismatch> {
    let mut scored = Vec::new();

    for candidate in candidates {
        let similarity = cosine_similarity(query_vector, &candidate.vector)?;
        if similarity >= threshold {
            scored.push(ScoredCandidate {
                segment_text: candidate.segment_text.clone(),
                similarity,
            });
        }
    }

    scored.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));

    if scored.len() < top_k {
        debug!(
            survivors = scored.len(),
            top_k, "fewer candidates than top_k survived the threshold"
        );
    }

    scored.truncate(top_k);
    Ok(scored)
}
