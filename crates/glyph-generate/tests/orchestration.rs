//! Retry orchestration against scripted collaborators.

use glyph_generate::{RetryConfig, RetryOrchestrator};
use glyph_llm::{Collaborator, ScriptedGenerator};
use glyph_types::{Mode, ProviderError, FINAL_MARKER, RETRY_MARKER};

const CAT: &str = " /\\_/\\\n( o.o )\n > ^ <";
const CUT_OFF_CAT: &str = " /\\_/\\\n( o.o )\n > ^ (";
const TREE: &str =
    "   /\\\n  /  \\\n /    \\\n/______\\\n   ||\n   ||\n   ||\n   ||\n  ====\n  ~~~~\n";

fn ladder() -> String {
    "/ /| |\\ \\\n".repeat(12)
}

fn retries(max_retries: usize) -> RetryConfig {
    RetryConfig {
        max_retries,
        strict: false,
    }
}

// ---------------------------------------------------------------------------
// Buffered
// ---------------------------------------------------------------------------

// Test 1: a rejected candidate is retried with feedback layered on the base prompt
#[tokio::test]
async fn buffered_retry_adds_feedback() {
    let generator = ScriptedGenerator::new(["| |\n".repeat(12), CAT.to_string()]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::basic(generator), Mode::Art);

    let generation = orchestrator.generate("a cat").await;
    assert!(generation.success);
    assert_eq!(generation.attempts, 2);
    assert_eq!(generation.content, CAT);

    let calls = log.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].system_prompt, orchestrator.system_prompt());
    assert!(calls[1].system_prompt.starts_with(orchestrator.system_prompt()));
    assert!(calls[1].system_prompt.contains("Vary each line"));
    assert_eq!(calls[1].prompt, "a cat");
}

// Test 2: exhausted budget returns the last cleaned candidate
#[tokio::test]
async fn buffered_exhaustion_returns_best_effort() {
    let generator = ScriptedGenerator::new([CUT_OFF_CAT]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::basic(generator), Mode::Art)
        .with_config(retries(2));

    let generation = orchestrator.generate("a cat").await;
    assert!(!generation.success);
    assert_eq!(generation.attempts, 3);
    assert_eq!(generation.content, CUT_OFF_CAT);
    assert_eq!(log.len(), 3);
    assert!(log.calls()[2].system_prompt.contains("Finish the drawing"));
    assert_eq!(orchestrator.memory().last().map(|i| i.success), Some(false));
}

// Test 3: provider errors are retried with unchanged prompts
#[tokio::test]
async fn provider_error_then_success() {
    let generator = ScriptedGenerator::from_results(vec![
        Err(ProviderError::QuotaExceeded {
            message: "slow down".into(),
        }),
        Ok(CAT.to_string()),
    ]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::basic(generator), Mode::Art);

    let generation = orchestrator.generate("a cat").await;
    assert!(generation.success);
    assert_eq!(generation.attempts, 2);
    let calls = log.calls();
    assert_eq!(calls[0].system_prompt, calls[1].system_prompt);
}

// Test 4: a provider error on the final attempt passes through as a sentinel
#[tokio::test]
async fn provider_error_passes_through() {
    let generator = ScriptedGenerator::from_results(vec![Err(ProviderError::timeout(60))]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::basic(generator), Mode::Art);

    let generation = orchestrator.generate("a cat").await;
    assert!(!generation.success);
    assert!(generation.content.starts_with("ERROR_CODE: TIMEOUT\nERROR_MESSAGE: Request timed out"));
    assert_eq!(log.len(), 3);
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

// Test 5: repeated ladders escalate once, then abort with a terminal sentinel
#[tokio::test]
async fn ladder_twice_ends_in_validation_failure() {
    let generator = ScriptedGenerator::new([ladder()]);
    let log = generator.log();
    let config = retries(2);
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Art)
        .with_config(config);

    let (fragments, result) = orchestrator.generate_stream("a dragon").collect_all().await;
    let joined = fragments.concat();

    assert!(joined.contains("ERROR_CODE: VALIDATION_FAILED"));
    assert!(log.len() <= 1 + config.max_retries + 1);
    assert_eq!(log.len(), 3);
    assert_eq!(fragments.iter().filter(|f| *f == RETRY_MARKER).count(), 2);

    let calls = log.calls();
    assert!(calls.iter().all(|c| c.streamed));
    assert!(calls[1].system_prompt.contains("# Corrections"));
    assert!(calls[2].system_prompt.contains("Start over from scratch"));
    assert!(!calls[2].system_prompt.contains("# Corrections"));

    let result = result.unwrap();
    assert!(!result.success);
    assert!(result.content.contains("VALIDATION_FAILED"));
}

// Test 6: a hard reset on the last budgeted attempt earns one extra attempt
#[tokio::test]
async fn hard_reset_grants_extra_attempt() {
    let generator = ScriptedGenerator::new([ladder()]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Art)
        .with_config(retries(1));

    let (fragments, _) = orchestrator.generate_stream("a dragon").collect_all().await;
    assert_eq!(log.len(), 3);
    assert!(fragments.concat().contains("ERROR_CODE: VALIDATION_FAILED"));
}

// Test 7: the gate cuts a ladder short before it is fully forwarded
#[tokio::test]
async fn gate_stops_forwarding_ladder() {
    let generator = ScriptedGenerator::new([ladder(), CAT.to_string()]);
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Art);

    let (fragments, result) = orchestrator.generate_stream("a cat").collect_all().await;
    let retry_at = fragments.iter().position(|f| f == RETRY_MARKER).unwrap();
    assert_eq!(retry_at, 5);
    assert_eq!(fragments[retry_at + 1..].concat(), CAT);
    let result = result.unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 2);
}

// Test 8: non-art modes never escalate to a hard reset
#[tokio::test]
async fn ladder_escalation_is_art_only() {
    let rows: Vec<&str> = (0..30)
        .map(|i| if i % 2 == 0 { "Q1 ████" } else { "Q2 ██" })
        .collect();
    let generator = ScriptedGenerator::new([rows.join("\n")]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Chart);

    let (fragments, result) = orchestrator.generate_stream("sales").collect_all().await;
    assert_eq!(log.len(), 3);
    assert!(!fragments.concat().contains("VALIDATION_FAILED"));
    assert!(log.calls().iter().all(|c| !c.system_prompt.contains("Start over")));
    assert!(!result.unwrap().success);
}

// Test 9: a cleaned re-render follows a [FINAL] marker
#[tokio::test]
async fn final_marker_carries_repaired_box() {
    let generator = ScriptedGenerator::new(["┌───────┐\n│ Hello │\n│ World │\n"]);
    let mut orchestrator =
        RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Diagram);

    let (fragments, result) = orchestrator.generate_stream("greeting").collect_all().await;
    let last = fragments.last().unwrap();
    assert!(last.starts_with(FINAL_MARKER));
    assert!(last.ends_with("└───────┘"));
    assert!(result.unwrap().success);
}

// Test 10: a basic collaborator streams its whole reply as one fragment
#[tokio::test]
async fn basic_collaborator_streams_single_fragment() {
    let generator = ScriptedGenerator::new([CAT]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::basic(generator), Mode::Art);

    let (fragments, result) = orchestrator.generate_stream("a cat").collect_all().await;
    assert_eq!(fragments, vec![CAT.to_string()]);
    assert!(result.unwrap().success);
    assert!(!log.calls()[0].streamed);
}

// Test 11: streamed retries carry feedback and a [RETRY] marker
#[tokio::test]
async fn streaming_retry_after_cut_off() {
    let generator = ScriptedGenerator::new([CUT_OFF_CAT, CAT]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Art);

    let mut run = orchestrator.generate_stream("a cat");
    let mut fragments = Vec::new();
    while let Some(fragment) = run.next().await {
        fragments.push(fragment);
    }
    assert_eq!(run.result().map(|g| g.attempts), Some(2));

    assert_eq!(fragments.concat(), format!("{CUT_OFF_CAT}{RETRY_MARKER}{CAT}"));
    assert!(log.calls()[1].system_prompt.contains("Finish the drawing"));
}

// Test 12: a streamed provider error on the last attempt is forwarded
#[tokio::test]
async fn streamed_provider_error_forwarded() {
    let generator = ScriptedGenerator::from_results(vec![Err(ProviderError::no_response())]);
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Art)
        .with_config(retries(0));

    let (fragments, result) = orchestrator.generate_stream("a cat").collect_all().await;
    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].starts_with("ERROR_CODE: NO_RESPONSE"));
    assert!(!result.unwrap().success);
}

// Test 13: a valid tree that trips the gate's short-run rule is accepted first time
#[tokio::test]
async fn early_gate_stop_accepts_valid_art() {
    let generator = ScriptedGenerator::new([TREE]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Art);

    let (fragments, result) = orchestrator.generate_stream("a pine tree").collect_all().await;
    assert_eq!(log.len(), 1);
    assert!(!fragments.iter().any(|f| f == RETRY_MARKER));
    assert!(!fragments.concat().contains("VALIDATION_FAILED"));
    let last = fragments.last().unwrap();
    assert!(last.starts_with(FINAL_MARKER));
    assert!(last.contains("~~~~"));
    let result = result.unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 1);
}

// Test 14: blank interior rows stop the gate but the box is still accepted
#[tokio::test]
async fn early_gate_stop_accepts_blank_row_box() {
    let content = format!("┌──────┐\n{}│ API  │\n└──────┘\n", "│      │\n".repeat(4));
    let generator = ScriptedGenerator::new([content]);
    let log = generator.log();
    let mut orchestrator =
        RetryOrchestrator::new(Collaborator::streaming(generator), Mode::Diagram);

    let (fragments, result) = orchestrator.generate_stream("an api").collect_all().await;
    assert_eq!(log.len(), 1);
    assert!(!fragments.iter().any(|f| f == RETRY_MARKER));
    assert!(fragments.last().unwrap().ends_with("└──────┘"));
    assert!(result.unwrap().success);
}

// Test 15: a chart run repaired by capping needs no retry
#[tokio::test]
async fn capped_chart_accepted_first_time() {
    let content = format!("┌────────┐\n{}└────────┘", "│ ██  ██ │\n".repeat(11));
    let generator = ScriptedGenerator::new([content]);
    let log = generator.log();
    let mut orchestrator = RetryOrchestrator::new(Collaborator::basic(generator), Mode::Chart);

    let generation = orchestrator.generate("two bars").await;
    assert!(generation.success);
    assert_eq!(generation.attempts, 1);
    assert_eq!(log.len(), 1);
    assert_eq!(generation.content.lines().count(), 7);
}
