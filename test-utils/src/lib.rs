//! Shared fixtures for giskard-rag integration tests
//!
//! This crate provides ready-made knowledge tables and scripted providers so
//! integration tests never touch the network:
//! - A small car-manual knowledge table with known content
//! - Scripted chat models answering topic-naming and generation calls
//! - Re-exports of the in-crate mock providers

use std::sync::Arc;

use serde_json::json;

use giskard_rag::chat_models::ChatModel;
use giskard_rag::documents::KnowledgeTable;
use giskard_rag::knowledge_base::{KnowledgeBase, KnowledgeBaseOptions};

pub use giskard_rag::chat_models::FakeChatModel;
pub use giskard_rag::embeddings::MockEmbeddings;

/// Name of the structured-output tool scripted generation answers target.
pub const GENERATE_INPUTS_TOOL: &str = "generate_inputs";

/// Initialize tracing for a test binary, honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A small English knowledge table with stable, recognizable content.
#[must_use]
pub fn car_manual_table() -> KnowledgeTable {
    KnowledgeTable::from_texts(
        [
            "The engine oil must be changed every 10,000 kilometers or once a year.",
            "The warranty covers the engine and transmission for five years.",
            "Tire pressure should be checked monthly and kept at 2.4 bar.",
            "The coolant reservoir is located behind the right headlight.",
            "Brake pads must be replaced when thinner than 3 millimeters.",
            "The spare wheel and jack are stored under the trunk floor.",
            "Use only SAE 5W-30 oil approved by the manufacturer.",
            "The service indicator resets through the trip button on the dashboard.",
        ]
        .into_iter()
        .map(str::to_string),
    )
}

/// A chat model that answers every call with a quoted topic name.
#[must_use]
pub fn topic_naming_model() -> Arc<FakeChatModel> {
    Arc::new(FakeChatModel::new(vec![
        "\"Car maintenance\"".to_string();
        8
    ]))
}

/// A chat model scripted with `count` question/answer tool responses.
///
/// Each response carries both a `question` and an `answer` field, so the
/// same script satisfies the question call and the answer call of a
/// generation round.
#[must_use]
pub fn generation_model(count: usize) -> Arc<FakeChatModel> {
    let responses = (0..count)
        .map(|i| {
            json!({"inputs": [{
                "question": format!("What does maintenance item {i} require?"),
                "answer": format!("Item {i} requires regular service."),
            }]})
        })
        .collect();
    Arc::new(FakeChatModel::with_tool_responses(
        GENERATE_INPUTS_TOOL,
        responses,
    ))
}

/// A knowledge base over [`car_manual_table`] with mock providers and a
/// fixed seed.
pub fn car_manual_knowledge_base(seed: u64) -> giskard_rag::Result<KnowledgeBase> {
    KnowledgeBase::new(
        car_manual_table(),
        Arc::new(MockEmbeddings::new()),
        topic_naming_model() as Arc<dyn ChatModel>,
        KnowledgeBaseOptions::default()
            .with_seed(seed)
            .with_min_topic_size(2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_table_shape() {
        let table = car_manual_table();
        assert_eq!(table.len(), 8);
        assert_eq!(table.columns(), ["text".to_string()]);
    }

    #[tokio::test]
    async fn test_fixture_knowledge_base_builds() {
        let kb = car_manual_knowledge_base(1).unwrap();
        assert_eq!(kb.len(), 8);
        assert_eq!(kb.language(), "en");
    }
}
