//! Follow-up question round: parse the service's question text, collect the
//! user's answers, package them for `submit_responses`.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ValidationError;

/// Leading `N.` numeral plus the whitespace after it.
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("numbered-question pattern"));

/// One question of a round. `index` is stable for the lifetime of the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionItem {
    pub index: usize,
    pub text: String,
}

/// A single `{question, answer}` pair as sent to the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub question: String,
    pub answer: String,
}

/// Ordered, non-empty list of answered questions.
///
/// Only constructible through [`collect_answers`], so an empty submission cannot
/// reach the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSubmission {
    responses: Vec<Response>,
}

impl AnswerSubmission {
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Parses raw question text into items.
///
/// Lines starting with `N.` become questions with the numeral stripped. When no
/// line is numbered but the text is not blank, the whole trimmed block becomes a
/// single question so free-form follow-up text is never dropped.
pub fn parse(raw: &str) -> Vec<QuestionItem> {
    let mut items: Vec<QuestionItem> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let numeral = NUMBERED.find(line)?;
            Some(line[numeral.end()..].trim().to_owned())
        })
        .enumerate()
        .map(|(index, text)| QuestionItem { index, text })
        .collect();

    let trimmed = raw.trim();
    if items.is_empty() && !trimmed.is_empty() {
        items.push(QuestionItem { index: 0, text: trimmed.to_owned() });
    }
    items
}

/// Pairs each item with its answer, keeping only non-blank answers in item order.
///
/// `answer_for` is looked up by item index. Fails with
/// [`ValidationError::NoAnswers`] when nothing was answered.
pub fn collect_answers<'a, F>(
    items: &[QuestionItem],
    answer_for: F,
) -> Result<AnswerSubmission, ValidationError>
where
    F: Fn(usize) -> Option<&'a str>,
{
    let responses: Vec<Response> = items
        .iter()
        .filter_map(|item| {
            let answer = answer_for(item.index)?.trim();
            (!answer.is_empty()).then(|| Response {
                question: item.text.clone(),
                answer: answer.to_owned(),
            })
        })
        .collect();

    if responses.is_empty() {
        return Err(ValidationError::NoAnswers);
    }
    Ok(AnswerSubmission { responses })
}
