use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QnaError, Result};

/// One knowledge-base question/answer pair. Immutable once loaded; the
/// resolution path only ever borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub question: String,
    pub answer: String,
}

impl Entry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A validated question. Construction trims the raw text and rejects
/// empty input, so unvalidated text never reaches the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QnaError::EmptyQuestion);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-scoring entry for one resolution, score in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: &'a Entry,
    pub score: f64,
}

/// Terminal value of the accept/reject decision. Never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome<'a> {
    SheetHit { entry: &'a Entry, score: f64 },
    FallbackNeeded { context: Option<String> },
}

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Sheet,
    Fallback,
}

/// The externally observed answer contract. `reasoning` is present only
/// for knowledge-base hits and is omitted from JSON when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub source: AnswerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_parse_trims() {
        let question = Question::parse("  what are your hours?  ").unwrap();
        assert_eq!(question.as_str(), "what are your hours?");
    }

    #[test]
    fn question_parse_rejects_blank_input() {
        assert!(matches!(Question::parse(""), Err(QnaError::EmptyQuestion)));
        assert!(matches!(
            Question::parse("   \t\n"),
            Err(QnaError::EmptyQuestion)
        ));
    }

    #[test]
    fn answer_result_omits_absent_reasoning() {
        let result = AnswerResult {
            answer: "42".to_string(),
            source: AnswerSource::Fallback,
            reasoning: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "fallback");
        assert!(json.get("reasoning").is_none());
    }

    #[test]
    fn answer_result_serializes_sheet_reasoning() {
        let result = AnswerResult {
            answer: "9 to 5".to_string(),
            source: AnswerSource::Sheet,
            reasoning: Some("score 1.00".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "sheet");
        assert_eq!(json["reasoning"], "score 1.00");
    }
}
