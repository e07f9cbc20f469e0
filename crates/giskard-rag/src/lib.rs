//! Knowledge-base indexing and synthetic test-set generation for RAG
//! assistants.
//!
//! The crate builds a [`KnowledgeBase`] from tabular content, lazily
//! computes embeddings, an exact L2 index, a 2D projection and named topic
//! clusters over it, then drives a [`TestsetGenerator`] that samples seed
//! contexts and asks a completion provider for question/answer pairs.
//! Generated samples can be rewritten by question modifiers (for example
//! into conversational two-turn exchanges) and the resulting [`TestSet`]
//! converts into a runnable test suite.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use giskard_rag::{
//!     KnowledgeBase, KnowledgeBaseOptions, KnowledgeTable, TestsetGenerator,
//! };
//! # use giskard_rag::{FakeChatModel, MockEmbeddings};
//!
//! # async fn demo() -> giskard_rag::Result<()> {
//! let table = KnowledgeTable::from_texts(vec![
//!     "The warranty covers the engine for five years.".to_string(),
//!     "Oil changes are due every 10,000 km.".to_string(),
//! ]);
//! let embedder = Arc::new(MockEmbeddings::new());
//! let llm = Arc::new(FakeChatModel::new(vec!["\"Maintenance\"".to_string()]));
//!
//! let kb = Arc::new(KnowledgeBase::new(
//!     table,
//!     embedder,
//!     llm.clone(),
//!     KnowledgeBaseOptions::default().with_seed(42),
//! )?);
//!
//! let generator = TestsetGenerator::new(
//!     kb,
//!     llm,
//!     "Shop Assistant",
//!     "Answers questions about car maintenance",
//! );
//! let testset = generator.generate_dataset(10).await?;
//! let _suite = testset.to_test_suite(None);
//! # Ok(())
//! # }
//! ```

pub mod chat_models;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod knowledge_base;
pub mod messages;
pub mod prompts;
pub mod testset;

pub use chat_models::{
    ChatModel, ChatResult, CompletionOptions, FakeChatModel, ToolChoice, ToolDefinition,
};
pub use documents::{Document, KnowledgeTable};
pub use embeddings::{Embeddings, MockEmbeddings};
pub use error::{Error, ErrorCategory, Result};
pub use knowledge_base::{
    DocumentGroup, KnowledgeBase, KnowledgeBaseOptions, KnowledgeBaseState, NOISE_TOPIC_ID,
};
pub use messages::{Message, ToolCall};
pub use testset::{
    ConversationalModifier, ModifierRegistry, QuestionModifier, QuestionSample, QuestionType,
    SampleMetadata, TestSet, TestSuite, TestsetGenerator,
};
