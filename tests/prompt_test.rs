//! Tests for prompt assembly: layout, instruction selection, document
//! windowing, and history rendering.

use muninn::prompt::{DOCUMENT_WINDOW_CHARS, STOP_SEQUENCES, build_prompt};
use muninn::types::{ChatMessage, QueryType};

const DOC: &str = "policy text describing coverage, deductibles, and exclusions";

#[test]
fn prompt_sections_appear_in_order() {
    let prompt = build_prompt(DOC, &[], "What is the deductible?", None);

    let document = prompt.find("### Document:").unwrap();
    let question = prompt.find("### New Question:").unwrap();
    let instructions = prompt.find("### Instructions:").unwrap();
    let answer = prompt.find("### Answer:").unwrap();
    assert!(document < question && question < instructions && instructions < answer);

    assert!(prompt.contains(DOC));
    assert!(prompt.contains("What is the deductible?"));
    assert!(prompt.ends_with("### Answer:"));
}

#[test]
fn untyped_query_gets_the_default_instruction() {
    let prompt = build_prompt(DOC, &[], "What is the deductible?", None);
    assert!(prompt.contains(QueryType::default_instruction()));
}

#[test]
fn query_type_selects_its_instruction() {
    let coverage = build_prompt(DOC, &[], "What is covered?", Some(QueryType::Coverage));
    let financial = build_prompt(DOC, &[], "What is covered?", Some(QueryType::Financial));

    assert!(coverage.contains(QueryType::Coverage.instruction()));
    assert!(financial.contains(QueryType::Financial.instruction()));
    assert_ne!(coverage, financial);
}

#[test]
fn empty_history_renders_no_history_block() {
    let prompt = build_prompt(DOC, &[], "What is the deductible?", None);
    assert!(!prompt.contains("--- Conversation History ---"));
}

#[test]
fn history_renders_as_user_and_answer_lines() {
    let history = vec![
        ChatMessage::user("What is the deductible?"),
        ChatMessage::assistant("The deductible is $500."),
    ];
    let prompt = build_prompt(DOC, &history, "What about annual payments?", None);

    assert!(prompt.contains("--- Conversation History ---"));
    assert!(prompt.contains("User: What is the deductible?"));
    assert!(prompt.contains("Answer: The deductible is $500."));
    assert!(prompt.contains("--- End History ---"));

    // History sits between the document and the new question.
    let history_pos = prompt.find("--- Conversation History ---").unwrap();
    assert!(prompt.find("### Document:").unwrap() < history_pos);
    assert!(history_pos < prompt.find("### New Question:").unwrap());
}

#[test]
fn long_document_is_windowed() {
    let long_doc = "x".repeat(DOCUMENT_WINDOW_CHARS + 1000);
    let prompt = build_prompt(&long_doc, &[], "What is the deductible?", None);

    let window = "x".repeat(DOCUMENT_WINDOW_CHARS);
    assert!(prompt.contains(&window));
    assert!(!prompt.contains(&format!("{window}x")));
}

#[test]
fn short_document_is_kept_whole() {
    let prompt = build_prompt(DOC, &[], "What is the deductible?", None);
    assert!(prompt.contains(DOC));
}

#[test]
fn stop_sequences_cut_off_fabricated_turns() {
    assert!(STOP_SEQUENCES.contains(&"###"));
    assert!(STOP_SEQUENCES.contains(&"User:"));
    assert!(STOP_SEQUENCES.contains(&"Question:"));
}
