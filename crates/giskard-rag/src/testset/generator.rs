//! Synthetic question/answer generation from a knowledge base.
//!
//! The generator samples a seed document plus its similarity-filtered
//! neighbors, formats them into a context block, and drives two structured
//! completion calls per sample: one constrained to return a `question`, one
//! constrained to return an `answer`. Both prompts are truncated to the
//! configured context window before leaving the process.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::chat_models::{ChatModel, CompletionOptions, ToolDefinition};
use crate::documents::Document;
use crate::error::{Error, Result};
use crate::knowledge_base::KnowledgeBase;
use crate::messages::Message;
use crate::prompts::{format_fstring, truncate_chars, vars};
use crate::testset::{QuestionSample, QuestionType, SampleMetadata, TestSet};

/// Default context window of the completion model, in tokens.
pub const DEFAULT_CONTEXT_WINDOW_LENGTH: usize = 8192;

/// Tokens are approximated as 4 characters each when budgeting prompts.
const CHARS_PER_TOKEN: usize = 4;

/// Sampling temperature for generation calls.
const GENERATION_TEMPERATURE: f32 = 0.5;

/// Difficulty assigned to every sample of the base generator.
const BASE_DIFFICULTY_LEVEL: u32 = 1;

/// Name of the forced structured-output tool.
const GENERATE_INPUTS_TOOL: &str = "generate_inputs";

const QUESTION_GENERATION_PROMPT: &str = r#"You are a powerful auditor, your role is to generate question from a given list of context paragraphs.

The assistant you are auditing is the following:
- Assistant name: {assistant_name}
- Assistant description: {assistant_description}

Your question must be related to a provided context.
Please respect the following rules to generate the question:
- The answer to the question should be found inside the provided context
- The question must be self-contained
- The question must be in this language: {language}

The provided context is delimited with markers. Here is the context:
{context}"#;

const ANSWER_GENERATION_PROMPT: &str = r#"Your role is to answer a question based only on the provided context paragraphs.
Do not use any knowledge outside the context. If the context does not hold the answer, say so.

Here is the question:
{question}

Here is the context the answer must be based on:
{context}"#;

/// Generator turning a knowledge base into a question/answer test set.
pub struct TestsetGenerator {
    knowledge_base: Arc<KnowledgeBase>,
    llm: Arc<dyn ChatModel>,
    assistant_name: String,
    assistant_description: String,
    language: Option<String>,
    context_window_length: usize,
}

impl TestsetGenerator {
    /// Create a generator over the given knowledge base and completion
    /// provider.
    #[must_use]
    pub fn new(
        knowledge_base: Arc<KnowledgeBase>,
        llm: Arc<dyn ChatModel>,
        assistant_name: impl Into<String>,
        assistant_description: impl Into<String>,
    ) -> Self {
        Self {
            knowledge_base,
            llm,
            assistant_name: assistant_name.into(),
            assistant_description: assistant_description.into(),
            language: None,
            context_window_length: DEFAULT_CONTEXT_WINDOW_LENGTH,
        }
    }

    /// Override the generation language; the knowledge base's dominant
    /// language is used by default.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the completion model's context window, in tokens.
    #[must_use]
    pub fn with_context_window_length(mut self, context_window_length: usize) -> Self {
        self.context_window_length = context_window_length;
        self
    }

    /// The language questions are generated in
    #[must_use]
    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .unwrap_or_else(|| self.knowledge_base.language())
    }

    /// The knowledge base being sampled
    #[must_use]
    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// Generate a test set of `num_samples` question/answer pairs.
    ///
    /// Samples are produced strictly sequentially, so results are
    /// reproducible given the knowledge base's seed and a deterministic
    /// provider. Any generation failure aborts the whole run; no partial
    /// test set is returned.
    pub async fn generate_dataset(&self, num_samples: usize) -> Result<TestSet> {
        let mut samples = Vec::with_capacity(num_samples);
        for idx in 0..num_samples {
            debug!(sample = idx, total = num_samples, "generating testset sample");
            samples.push(self.generate_sample().await?);
        }
        Ok(TestSet::new(samples))
    }

    async fn generate_sample(&self) -> Result<QuestionSample> {
        let group = self.knowledge_base.random_document_group().await?;
        let context = format_context(&group.documents);

        let question = self.generate_question(&context).await?;
        let answer = self.generate_answer(&question, &context).await?;

        let topic = self
            .knowledge_base
            .topics()
            .await?
            .get(&group.topic_id)
            .cloned();

        Ok(QuestionSample {
            question,
            reference_answer: answer,
            reference_context: context,
            difficulty_level: BASE_DIFFICULTY_LEVEL,
            conversation_history: Vec::new(),
            metadata: SampleMetadata {
                question_type: QuestionType::Simple,
                seed_document_id: group.seed_document_id,
                topic,
            },
        })
    }

    async fn generate_question(&self, context: &str) -> Result<String> {
        let prompt = format_fstring(
            QUESTION_GENERATION_PROMPT,
            &vars([
                ("assistant_name", self.assistant_name.as_str()),
                ("assistant_description", self.assistant_description.as_str()),
                ("language", self.language()),
                ("context", context),
            ]),
        )?;
        self.structured_completion(&prompt, "question").await
    }

    async fn generate_answer(&self, question: &str, context: &str) -> Result<String> {
        let prompt = format_fstring(
            ANSWER_GENERATION_PROMPT,
            &vars([("question", question), ("context", context)]),
        )?;
        self.structured_completion(&prompt, "answer").await
    }

    /// Issue one completion forced through the `generate_inputs` tool and
    /// extract the named string field from its first input object.
    async fn structured_completion(&self, prompt: &str, field: &str) -> Result<String> {
        let prompt = truncate_chars(prompt, self.context_window_length * CHARS_PER_TOKEN);
        let options = CompletionOptions::forced_tool(
            generate_inputs_tool(field),
            Some(GENERATION_TEMPERATURE),
        );

        let result = self
            .llm
            .complete(&[Message::system(prompt)], &options)
            .await?;

        let call = result
            .tool_call(GENERATE_INPUTS_TOOL)
            .ok_or_else(|| Error::generation("could not parse generated inputs"))?;
        let value = call.arguments["inputs"][0][field]
            .as_str()
            .ok_or_else(|| {
                Error::generation(format!("generated inputs are missing the '{field}' field"))
            })?;
        if value.is_empty() {
            return Err(Error::generation(format!(
                "generated '{field}' field is empty"
            )));
        }
        Ok(value.to_string())
    }
}

/// Format a document group into the numbered context block embedded in
/// generation prompts.
#[must_use]
pub fn format_context(documents: &[Arc<Document>]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(idx, doc)| {
            format!("### Context {} ###\n{}\n######", idx + 1, doc.content())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn generate_inputs_tool(field: &str) -> ToolDefinition {
    ToolDefinition::new(
        GENERATE_INPUTS_TOOL,
        "generates inputs for model audit",
        json!({
            "type": "object",
            "properties": {
                "inputs": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { field: { "type": "string" } },
                    },
                },
            },
            "required": ["inputs"],
        }),
    )
}
