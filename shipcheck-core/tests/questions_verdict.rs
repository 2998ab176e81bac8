//! Integration tests for the question round and verdict extraction.

use shipcheck_core::error::ValidationError;
use shipcheck_core::questions::{self, QuestionItem};
use shipcheck_core::verdict::{Assessment, Verdict};

#[test]
fn empty_text_yields_no_questions() {
    assert!(questions::parse("").is_empty());
    assert!(questions::parse("  \n \t ").is_empty());
}

#[test]
fn unnumbered_text_becomes_a_single_question() {
    let items = questions::parse("  random text, no numbering \n");
    assert_eq!(
        items,
        vec![QuestionItem { index: 0, text: "random text, no numbering".into() }]
    );
}

#[test]
fn numbered_lines_are_stripped_and_reindexed() {
    let raw = "Here is what I need:\n\
               1. Which database do you use?\n\
               \n   2.    What port does the app listen on?  \n\
               3.No space after the dot\n\
               10. Double digits";
    let items = questions::parse(raw);

    let texts: Vec<&str> = items.iter().map(|q| q.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Which database do you use?",
            "What port does the app listen on?",
            "No space after the dot",
            "Double digits",
        ]
    );
    let indexes: Vec<usize> = items.iter().map(|q| q.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
}

#[test]
fn all_blank_answers_are_rejected() {
    let items = questions::parse("1. A?\n2. B?");
    let answers = ["", "   "];
    let result = questions::collect_answers(&items, |i| answers.get(i).copied());
    assert_eq!(result.unwrap_err(), ValidationError::NoAnswers);
}

#[test]
fn only_answered_questions_are_submitted_in_order() {
    let items = questions::parse("1. A?\n2. B?\n3. C?");
    let answers = vec!["first".to_owned(), String::new(), "  third ".to_owned()];
    let submission =
        questions::collect_answers(&items, |i| answers.get(i).map(String::as_str)).unwrap();

    let pairs: Vec<(&str, &str)> = submission
        .responses()
        .iter()
        .map(|r| (r.question.as_str(), r.answer.as_str()))
        .collect();
    assert_eq!(pairs, vec![("A?", "first"), ("C?", "third")]);
    assert_eq!(submission.len(), 2);
}

#[test]
fn missing_answer_slots_count_as_blank() {
    let items = questions::parse("1. A?\n2. B?");
    let answers = ["only the first"];
    let submission = questions::collect_answers(&items, |i| answers.get(i).copied()).unwrap();
    assert_eq!(submission.len(), 1);
}

#[test]
fn verdict_markers_are_case_insensitive() {
    assert_eq!(Verdict::extract("Summary...\n**ANSWER: YES**\nDetails"), Verdict::Yes);
    assert_eq!(Verdict::extract("...**ANSWER: no**..."), Verdict::No);
    assert_eq!(Verdict::extract("**answer:YES**"), Verdict::Yes);
}

#[test]
fn text_without_marker_is_unknown_not_no() {
    assert_eq!(Verdict::extract("The answer is probably no."), Verdict::Unknown);
    assert_eq!(Verdict::extract("ANSWER: NO"), Verdict::Unknown);
    assert_eq!(Verdict::Unknown.to_string(), "?");
}

#[test]
fn assessment_keeps_text_and_verdict() {
    let assessment = Assessment::from_final_text("**ANSWER: NO**\nMissing Dockerfile".into());
    assert_eq!(assessment.verdict, Verdict::No);
    assert!(assessment.final_assessment.contains("Missing Dockerfile"));
}

#[test]
fn verdict_names_round_trip_for_storage() {
    for verdict in [Verdict::Yes, Verdict::No, Verdict::Unknown] {
        assert_eq!(Verdict::from_str_lossy(verdict.as_str()), verdict);
    }
}
