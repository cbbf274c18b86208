mod config;

pub use config::EngineConfig;

use tracing::debug;

use qna_core::{
    best_match, decide, sheet_reasoning, AnswerResult, AnswerSource, MatchPolicy, QnaError,
    Question, ResolutionOutcome, Result,
};
use qna_kb::EntryStore;
use qna_llm::LlmClient;

/// Resolve one question against the knowledge base, delegating to the
/// generative provider when no confident match exists.
///
/// Each invocation starts fresh: fetch a snapshot, pick the best match,
/// apply the threshold, assemble exactly one answer. The only side effects
/// are the two collaborator calls.
pub async fn resolve_question(
    store: &EntryStore,
    provider: &LlmClient,
    question: &Question,
    policy: &MatchPolicy,
) -> Result<AnswerResult> {
    let entries = store
        .entries()
        .await
        .map_err(|err| QnaError::SourceUnavailable(err.to_string()))?;
    let best = best_match(&entries, question.as_str());
    match decide(&entries, best, policy) {
        ResolutionOutcome::SheetHit { entry, score } => {
            debug!(score, entry = %entry.question, "answered from knowledge base");
            Ok(AnswerResult {
                answer: entry.answer.clone(),
                source: AnswerSource::Sheet,
                reasoning: Some(sheet_reasoning(entry, score)),
            })
        }
        ResolutionOutcome::FallbackNeeded { context } => {
            debug!(has_context = context.is_some(), "delegating to answer provider");
            let answer = provider
                .answer(question.as_str(), context.as_deref())
                .await
                .map_err(|err| QnaError::ProviderUnavailable(err.to_string()))?;
            Ok(AnswerResult {
                answer,
                source: AnswerSource::Fallback,
                reasoning: None,
            })
        }
    }
}
