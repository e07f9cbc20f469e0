//! Generated test sets and their suite conversion.
//!
//! A [`TestSet`] holds the question/answer samples produced by the
//! generator. It converts into a [`TestSuite`] binding a single correctness
//! test against the whole dataset.

pub mod generator;
pub mod modifiers;

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::messages::Message;

pub use generator::{TestsetGenerator, DEFAULT_CONTEXT_WINDOW_LENGTH};
pub use modifiers::{ConversationalModifier, ModifierRegistry, QuestionModifier};

/// Kind of question a sample carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum QuestionType {
    /// A plain single-turn question
    Simple,
    /// A question rewritten into a two-turn conversational exchange
    Conversational,
}

impl QuestionType {
    /// Stable identifier used in sample metadata
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            QuestionType::Simple => "simple",
            QuestionType::Conversational => "conversational",
        }
    }
}

/// Provenance and typing metadata attached to each sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// Kind of question
    pub question_type: QuestionType,
    /// Id of the document the sample's context was seeded from
    pub seed_document_id: i64,
    /// Name of the seed document's topic, when topics were computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// One generated question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSample {
    /// The question to ask the assistant under test
    pub question: String,
    /// The expected answer according to the knowledge base
    pub reference_answer: String,
    /// Knowledge-base excerpts the pair was generated from
    pub reference_context: String,
    /// How challenging the question is intended to be
    pub difficulty_level: u32,
    /// Prior turns to replay before asking the question; empty for
    /// single-turn samples
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history: Vec<Message>,
    /// Provenance and typing metadata
    pub metadata: SampleMetadata,
}

/// A generated test set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSet {
    samples: Vec<QuestionSample>,
}

impl TestSet {
    /// Create a test set from generated samples
    #[must_use]
    pub fn new(samples: Vec<QuestionSample>) -> Self {
        Self { samples }
    }

    /// The samples, in generation order
    #[must_use]
    pub fn samples(&self) -> &[QuestionSample] {
        &self.samples
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the test set has no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Save as JSON Lines, one sample per line.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        for sample in &self.samples {
            serde_json::to_writer(&mut writer, sample)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a test set saved with [`TestSet::save`]. Blank lines are
    /// skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut samples = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            samples.push(serde_json::from_str(&line)?);
        }
        Ok(Self { samples })
    }

    /// Convert into a runnable test suite.
    ///
    /// The suite binds one correctness test against the full dataset. A
    /// default name is used when `name` is `None`.
    #[must_use]
    pub fn to_test_suite(self, name: Option<String>) -> TestSuite {
        let name = name.unwrap_or_else(|| "Test suite generated from testset".to_string());
        TestSuite {
            name,
            tests: vec![SuiteTest {
                id: CORRECTNESS_TEST_ID.to_string(),
                display_name: CORRECTNESS_TEST_ID.to_string(),
            }],
            dataset: self,
        }
    }
}

/// Identifier of the correctness test bound by [`TestSet::to_test_suite`].
pub const CORRECTNESS_TEST_ID: &str = "TestsetCorrectnessTest";

/// One test registered in a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteTest {
    /// Unique id within the suite
    pub id: String,
    /// Human-readable name
    pub display_name: String,
}

/// A runnable suite: a named dataset plus the tests bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    name: String,
    dataset: TestSet,
    tests: Vec<SuiteTest>,
}

impl TestSuite {
    /// Suite name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dataset every test runs against
    #[must_use]
    pub fn dataset(&self) -> &TestSet {
        &self.dataset
    }

    /// Registered tests
    #[must_use]
    pub fn tests(&self) -> &[SuiteTest] {
        &self.tests
    }
}
