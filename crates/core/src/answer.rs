use crate::models::{RelevanceVerdict, ScoredCandidate};

pub const NO_RELEVANT_INFORMATION: &str = "no relevant information found";

const INSTRUCTION: &str = "Based on the following context, answer the question. \
If you can't answer from the context, say \"I don't have information about this.\"";

/// Decides whether the ranked evidence is strong enough to ground an
/// answer. An empty set is never grounded; a non-empty set must also clear
/// `threshold + margin` on mean similarity, which rejects sparse weak
/// matches that slipped past the per-candidate filter.
pub fn assess(candidates: &[ScoredCandidate], threshold: f64, margin: f64) -> RelevanceVerdict {
    if candidates.is_empty() {
        return RelevanceVerdict {
            grounded: false,
            reason: NO_RELEVANT_INFORMATION.to_string(),
            mean_similarity: None,
        };
    }

    let mean = candidates
        .iter()
        .map(|candidate| candidate.similarity)
        .sum::<f64>()
        / candidates.len() as f64;

    let required = threshold + margin;
    if mean < required {
        return RelevanceVerdict {
            grounded: false,
            reason: format!("mean similarity {mean:.3} below required {required:.3}"),
            mean_similarity: Some(mean),
        };
    }

    RelevanceVerdict {
        grounded: true,
        reason: "sufficient supporting evidence".to_string(),
        mean_similarity: Some(mean),
    }
}

/// Concatenates the surviving segments in ranked order, separated by a
/// blank line.
pub fn build_context(candidates: &[ScoredCandidate]) -> String {
    candidates
        .iter()
        .map(|candidate| candidate.segment_text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Composes the grounding prompt handed to the generation provider. An
/// optional filter directive is prepended to bias the provider's framing
/// without touching retrieval.
pub fn build_prompt(context: &str, question: &str, filter_directive: Option<&str>) -> String {
    let body = format!("{INSTRUCTION}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:");

    match filter_directive {
        Some(directive) if !directive.trim().is_empty() => format!("{directive}\n\n{body}"),
        _ => body,
    }
}
