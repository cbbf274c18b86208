use qna_core::{best_match, decide, Entry, MatchPolicy, ResolutionOutcome};

#[test]
fn normalized_exact_match_is_answered_from_the_sheet() {
    let entries = vec![Entry::new("What are your hours?", "9 to 5")];
    let best = best_match(&entries, "what are your hours").unwrap();
    assert_eq!(best.score, 1.0);

    match decide(&entries, Some(best), &MatchPolicy::default()) {
        ResolutionOutcome::SheetHit { entry, score } => {
            assert_eq!(entry.answer, "9 to 5");
            assert_eq!(format!("score {score:.2}"), "score 1.00");
        }
        other => panic!("expected sheet hit, got {other:?}"),
    }
}

#[test]
fn unrelated_question_falls_back_with_context() {
    let entries = vec![Entry::new("refund policy", "30 days")];
    let best = best_match(&entries, "what's the weather").unwrap();
    assert_eq!(best.score, 0.0);

    match decide(&entries, Some(best), &MatchPolicy::default()) {
        ResolutionOutcome::FallbackNeeded { context } => {
            assert_eq!(context.as_deref(), Some("Q: refund policy\nA: 30 days"));
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}

#[test]
fn empty_knowledge_base_never_blocks_answering() {
    let entries: Vec<Entry> = Vec::new();
    let best = best_match(&entries, "anything");
    assert!(best.is_none());

    let outcome = decide(&entries, best, &MatchPolicy::default());
    assert!(matches!(
        outcome,
        ResolutionOutcome::FallbackNeeded { context: None }
    ));
}

#[test]
fn equal_scores_keep_source_order() {
    let entries = vec![
        Entry::new("return policy", "A"),
        Entry::new("refund policy", "B"),
    ];
    // "policy" is contained in both questions, so both score 0.9 and the
    // first entry wins the tie deterministically.
    let best = best_match(&entries, "policy").unwrap();
    assert_eq!(best.entry.answer, "A");
    assert_eq!(best.score, 0.9);

    match decide(&entries, Some(best), &MatchPolicy::default()) {
        ResolutionOutcome::SheetHit { entry, .. } => assert_eq!(entry.answer, "A"),
        other => panic!("expected sheet hit, got {other:?}"),
    }
}

#[test]
fn single_shared_word_without_containment_falls_back() {
    let entries = vec![
        Entry::new("how fast is standard shipping", "3 to 5 days"),
        Entry::new("how do I reset my password", "Use the account page"),
    ];
    let best = best_match(&entries, "how heavy is the box").unwrap();
    assert!(best.score < 0.6);

    let outcome = decide(&entries, Some(best), &MatchPolicy::default());
    assert!(matches!(outcome, ResolutionOutcome::FallbackNeeded { .. }));
}

#[test]
fn classification_is_idempotent_for_fixed_inputs() {
    let entries = vec![
        Entry::new("do you ship internationally", "Yes, worldwide"),
        Entry::new("what are your hours", "9 to 5"),
    ];
    let policy = MatchPolicy::default();
    let first = best_match(&entries, "do you ship internationally?").unwrap();
    let second = best_match(&entries, "do you ship internationally?").unwrap();
    assert_eq!(first.score, second.score);
    assert_eq!(first.entry, second.entry);
    assert_eq!(
        matches!(
            decide(&entries, Some(first), &policy),
            ResolutionOutcome::SheetHit { .. }
        ),
        matches!(
            decide(&entries, Some(second), &policy),
            ResolutionOutcome::SheetHit { .. }
        )
    );
}
