use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Entry, MatchResult};

/// Containment is a strong signal but stays below an exact normalized match,
/// so identical normalized strings still score 1.0 via token overlap.
const CONTAINMENT_WEIGHT: f64 = 0.9;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

/// NFKC fold, lowercase, strip punctuation, collapse internal whitespace,
/// trim. Idempotent.
pub fn normalize(text: &str) -> String {
    let folded = text.nfkc().collect::<String>().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&folded, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_set(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Similarity between a raw query and one stored question, in [0, 1].
///
/// Token-overlap ratio (Jaccard over the normalized word sets) combined with
/// a containment bonus when one normalized string contains the other:
/// `max(jaccard, 0.9 * containment)`. Degenerate inputs score 0.0; there is
/// no error path.
pub fn score(query: &str, candidate: &str) -> f64 {
    let query = normalize(query);
    let candidate = normalize(candidate);
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let query_tokens = token_set(&query);
    let candidate_tokens = token_set(&candidate);
    let intersection = query_tokens.intersection(&candidate_tokens).count();
    let union = query_tokens.union(&candidate_tokens).count();
    let jaccard = intersection as f64 / union as f64;
    let contained = query.contains(&candidate) || candidate.contains(&query);
    if contained {
        jaccard.max(CONTAINMENT_WEIGHT)
    } else {
        jaccard
    }
}

/// Best-scoring entry for the query.
///
/// Linear scan over every entry with no early exit; only a strictly greater
/// score replaces the current best, so ties keep the entry appearing earlier
/// in source order. `None` only for an empty slice; thresholding is the
/// caller's job.
pub fn best_match<'a>(entries: &'a [Entry], query: &str) -> Option<MatchResult<'a>> {
    let mut best: Option<MatchResult<'a>> = None;
    for entry in entries {
        let entry_score = score(query, &entry.question);
        let replace = match &best {
            Some(current) => entry_score > current.score,
            None => true,
        };
        if replace {
            best = Some(MatchResult {
                entry,
                score: entry_score,
            });
        }
    }
    best
}
