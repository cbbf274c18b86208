mod error;
mod matcher;
mod model;
mod resolve;

pub use error::{QnaError, Result};
pub use matcher::{best_match, normalize, score};
pub use model::{AnswerResult, AnswerSource, Entry, MatchResult, Question, ResolutionOutcome};
pub use resolve::{
    decide, fallback_context, sheet_reasoning, MatchPolicy, ACCEPT_THRESHOLD,
    FALLBACK_CONTEXT_SIZE,
};
