use std::time::Duration;

use qna_core::{AnswerSource, Entry, MatchPolicy, Question};
use qna_engine::resolve_question;
use qna_kb::{EntrySource, EntryStore};
use qna_llm::{LlmClient, LlmProvider};

fn store_with(entries: Vec<Entry>) -> EntryStore {
    EntryStore::new(EntrySource::fixed(entries), Duration::from_secs(3600))
}

fn local_provider() -> LlmClient {
    LlmClient::new(LlmProvider::Local, "local").unwrap()
}

#[tokio::test]
async fn confident_match_is_answered_from_the_sheet() {
    let store = store_with(vec![Entry::new("What are your hours?", "9 to 5")]);
    let provider = local_provider();
    let question = Question::parse("what are your hours").unwrap();

    let result = resolve_question(&store, &provider, &question, &MatchPolicy::default())
        .await
        .unwrap();
    assert_eq!(result.source, AnswerSource::Sheet);
    assert_eq!(result.answer, "9 to 5");
    let reasoning = result.reasoning.unwrap();
    assert!(reasoning.contains("What are your hours?"));
    assert!(reasoning.contains("score 1.00"));
}

#[tokio::test]
async fn unrelated_question_is_delegated_with_context() {
    let store = store_with(vec![Entry::new("refund policy", "30 days")]);
    let provider = local_provider();
    let question = Question::parse("what's the weather").unwrap();

    let result = resolve_question(&store, &provider, &question, &MatchPolicy::default())
        .await
        .unwrap();
    assert_eq!(result.source, AnswerSource::Fallback);
    assert!(result.reasoning.is_none());
    // The local provider echoes the excerpt it was grounded with.
    assert!(result.answer.contains("refund policy"));
}

#[tokio::test]
async fn empty_knowledge_base_still_answers_via_fallback() {
    let store = store_with(Vec::new());
    let provider = local_provider();
    let question = Question::parse("anything").unwrap();

    let result = resolve_question(&store, &provider, &question, &MatchPolicy::default())
        .await
        .unwrap();
    assert_eq!(result.source, AnswerSource::Fallback);
    assert!(result.reasoning.is_none());
}

#[tokio::test]
async fn threshold_boundary_is_inclusive_through_the_engine() {
    // "policy" vs "refund policy" scores exactly 0.9 via containment.
    let store = store_with(vec![Entry::new("refund policy", "30 days")]);
    let provider = local_provider();
    let question = Question::parse("policy").unwrap();

    let at_boundary = MatchPolicy {
        accept_threshold: 0.9,
        ..MatchPolicy::default()
    };
    let result = resolve_question(&store, &provider, &question, &at_boundary)
        .await
        .unwrap();
    assert_eq!(result.source, AnswerSource::Sheet);

    let above_boundary = MatchPolicy {
        accept_threshold: 0.9 + 1e-9,
        ..MatchPolicy::default()
    };
    let result = resolve_question(&store, &provider, &question, &above_boundary)
        .await
        .unwrap();
    assert_eq!(result.source, AnswerSource::Fallback);
}

#[tokio::test]
async fn source_failure_is_surfaced_not_swallowed() {
    let store = EntryStore::new(
        EntrySource::file("/nonexistent/kb.csv"),
        Duration::from_secs(3600),
    );
    let provider = local_provider();
    let question = Question::parse("anything").unwrap();

    let err = resolve_question(&store, &provider, &question, &MatchPolicy::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("knowledge base unavailable"));
}
