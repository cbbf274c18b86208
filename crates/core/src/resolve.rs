use crate::model::{Entry, MatchResult, ResolutionOutcome};

/// Minimum score required to answer from the knowledge base. Inclusive:
/// a majority-token overlap or a substring containment qualifies, a single
/// shared stop-word does not.
pub const ACCEPT_THRESHOLD: f64 = 0.6;

/// How many entries are rendered into the fallback context summary.
pub const FALLBACK_CONTEXT_SIZE: usize = 5;

/// Accept/reject policy applied to the best match of one resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    pub accept_threshold: f64,
    pub fallback_context_size: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            accept_threshold: ACCEPT_THRESHOLD,
            fallback_context_size: FALLBACK_CONTEXT_SIZE,
        }
    }
}

/// The first `size` entries rendered as Q/A pairs, used to ground the
/// fallback provider. `None` when there is nothing to render.
pub fn fallback_context(entries: &[Entry], size: usize) -> Option<String> {
    if entries.is_empty() || size == 0 {
        return None;
    }
    let summary = entries
        .iter()
        .take(size)
        .map(|entry| format!("Q: {}\nA: {}", entry.question, entry.answer))
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(summary)
}

/// Threshold decision converting the best match into a resolution outcome.
///
/// An absent best match (empty knowledge base) is treated exactly like a
/// rejected one: the resolution falls through to the provider, it never
/// errors here.
pub fn decide<'a>(
    entries: &'a [Entry],
    best: Option<MatchResult<'a>>,
    policy: &MatchPolicy,
) -> ResolutionOutcome<'a> {
    match best {
        Some(result) if result.score >= policy.accept_threshold => ResolutionOutcome::SheetHit {
            entry: result.entry,
            score: result.score,
        },
        _ => ResolutionOutcome::FallbackNeeded {
            context: fallback_context(entries, policy.fallback_context_size),
        },
    }
}

/// Audit line for a knowledge-base hit, score rendered at two decimals.
pub fn sheet_reasoning(entry: &Entry, score: f64) -> String {
    format!(
        "Matched knowledge base entry \"{}\" (score {:.2})",
        entry.question, score
    )
}
