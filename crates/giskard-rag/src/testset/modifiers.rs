//! Question modifiers: post-generation rewrites of testset samples.
//!
//! A modifier takes one generated sample and rewrites it into a harder
//! variant, tagging the sample's metadata with its question type. Modifiers
//! are stateless aside from their fixed prompt; new variants implement
//! [`QuestionModifier`] and register themselves in a [`ModifierRegistry`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::chat_models::{ChatModel, CompletionOptions};
use crate::error::{Error, Result};
use crate::knowledge_base::KnowledgeBase;
use crate::messages::Message;
use crate::prompts::{vars, QaPromptTemplate};
use crate::testset::{QuestionSample, QuestionType, TestSet};

const CONVERSATIONAL_SYSTEM_PROMPT: &str = r#"You are an expert at re-writing questions.

Your task is to split a question into two messages. First, the introduction message present the request of the user, and then the second message ask the question without any reference to the topic.

Please respect the following rules to generate the question:
- The introduction message should not ask the question.
- The introduction message MUST contain all the objects and complements from the original question.
- The second message should ask a question without any reference to the topic or context.
- The second message should use demonstrative pronouns or other indirect references as much as possible.
- The second message should not understandable without the first message, it should NOT be self-contained.
- The messages and answer must be in this language: {language}.
- Make sure that the meaning of the original question cannot be infered from the generated question.

You will be provided the original question between <question> and </question> tags.
Your output should be a single JSON object, with keys 'introduction' and 'question'. Make sure you return a valid JSON object.
"#;

const CONVERSATIONAL_USER_TEMPLATE: &str = "<question>{question}</question>";

const CONVERSATIONAL_USER_EXAMPLE: &str =
    "<question>Is it possible to repair the car without any tools?</question>";

const CONVERSATIONAL_ASSISTANT_EXAMPLE: &str =
    r#"{"introduction":"I want to repair the car without tools.","question":"Is it possible?"}"#;

/// Rewrite one generated question into a harder variant.
///
/// Implementations must not mutate the knowledge base; they read it only
/// for context. A failed rewrite returns an error rather than a partially
/// modified sample.
#[async_trait]
pub trait QuestionModifier: Send + Sync {
    /// The question type stamped onto modified samples
    fn question_type(&self) -> QuestionType;

    /// Rewrite a sample.
    async fn modify(
        &self,
        sample: QuestionSample,
        knowledge_base: &KnowledgeBase,
        assistant_description: &str,
        language: &str,
    ) -> Result<QuestionSample>;
}

/// Registry of available modifiers, looked up by question type.
#[derive(Default)]
pub struct ModifierRegistry {
    modifiers: Vec<Arc<dyn QuestionModifier>>,
}

impl ModifierRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier, replacing any previous one of the same type
    pub fn register(&mut self, modifier: Arc<dyn QuestionModifier>) {
        self.modifiers
            .retain(|m| m.question_type() != modifier.question_type());
        self.modifiers.push(modifier);
    }

    /// Look up the modifier for a question type
    #[must_use]
    pub fn get(&self, question_type: QuestionType) -> Option<&Arc<dyn QuestionModifier>> {
        self.modifiers
            .iter()
            .find(|m| m.question_type() == question_type)
    }

    /// Apply the modifier of the given type to every sample of a test set.
    ///
    /// Fails if no such modifier is registered or if any rewrite fails; no
    /// partially modified test set is returned.
    pub async fn apply(
        &self,
        question_type: QuestionType,
        testset: TestSet,
        knowledge_base: &KnowledgeBase,
        assistant_description: &str,
        language: &str,
    ) -> Result<TestSet> {
        let modifier = self.get(question_type).ok_or_else(|| {
            Error::configuration(format!(
                "no modifier registered for question type '{}'",
                question_type.tag()
            ))
        })?;

        let mut modified = Vec::with_capacity(testset.len());
        for sample in testset.samples() {
            modified.push(
                modifier
                    .modify(sample.clone(), knowledge_base, assistant_description, language)
                    .await?,
            );
        }
        Ok(TestSet::new(modified))
    }
}

/// Splits a single-turn question into an introduction turn plus a
/// context-free follow-up question.
pub struct ConversationalModifier {
    llm: Arc<dyn ChatModel>,
    prompt: QaPromptTemplate,
}

impl ConversationalModifier {
    /// Create the modifier over a completion provider
    #[must_use]
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self {
            llm,
            prompt: QaPromptTemplate::new(
                CONVERSATIONAL_SYSTEM_PROMPT,
                CONVERSATIONAL_USER_TEMPLATE,
            )
            .with_example(CONVERSATIONAL_USER_EXAMPLE, CONVERSATIONAL_ASSISTANT_EXAMPLE),
        }
    }

    async fn rewrite(&self, question: &str, language: &str) -> Result<(String, String)> {
        let messages = self.prompt.to_messages(
            &vars([("language", language)]),
            &vars([("question", question)]),
        )?;

        let result = self
            .llm
            .complete(&messages, &CompletionOptions::with_temperature(0.5))
            .await?;

        let parsed: Value = serde_json::from_str(strip_code_fences(result.text()))
            .map_err(|e| Error::generation(format!("could not parse rewritten question: {e}")))?;
        let introduction = string_field(&parsed, "introduction")?;
        let rewritten = string_field(&parsed, "question")?;
        Ok((introduction, rewritten))
    }
}

#[async_trait]
impl QuestionModifier for ConversationalModifier {
    fn question_type(&self) -> QuestionType {
        QuestionType::Conversational
    }

    async fn modify(
        &self,
        mut sample: QuestionSample,
        _knowledge_base: &KnowledgeBase,
        _assistant_description: &str,
        language: &str,
    ) -> Result<QuestionSample> {
        debug!(seed_document_id = sample.metadata.seed_document_id, "rewriting question");
        let (introduction, question) = self.rewrite(&sample.question, language).await?;

        sample.question = question;
        sample.conversation_history = vec![Message::human(introduction)];
        sample.metadata.question_type = self.question_type();
        Ok(sample)
    }
}

fn string_field(value: &Value, key: &str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::generation(format!("rewritten question is missing the '{key}' key"))
        })
}

/// Strip surrounding Markdown code fences some providers wrap JSON in.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
