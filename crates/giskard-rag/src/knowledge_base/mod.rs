//! Knowledge base: documents, embeddings, similarity search and topics.
//!
//! [`KnowledgeBase`] owns the document collection built from a
//! [`KnowledgeTable`] and orchestrates the expensive artifacts lazily:
//! embeddings are computed on first use and cached for the knowledge base's
//! lifetime, the L2 index is built from them, the 2D projection from the
//! embeddings, and topic clustering plus LLM topic naming from the
//! projection. Each artifact is guarded by a compute-once cell, so a
//! multi-threaded caller gets exactly one computation.

pub mod clustering;
pub mod index;
pub mod language;
pub mod projection;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::chat_models::{ChatModel, CompletionOptions};
use crate::documents::{Document, KnowledgeTable, ID_COLUMN};
use crate::embeddings::Embeddings;
use crate::error::{Error, Result};
use crate::messages::Message;
use crate::prompts::{format_fstring, truncate_chars, vars};

pub use clustering::{ClusteringParams, NOISE_TOPIC_ID};
pub use index::FlatL2Index;
pub use projection::ProjectionConfig;

/// Label of the noise topic in every topics mapping.
pub const OTHERS_TOPIC_NAME: &str = "Others";

/// Character budget for the topic-naming prompt context.
const TOPIC_CONTEXT_BUDGET: usize = 3 * 8192;

/// Number of documents sampled for dominant-language detection.
const LANGUAGE_SAMPLE_SIZE: usize = 10;

/// Characters of each sampled document considered for language detection.
const LANGUAGE_SNIPPET_CHARS: usize = 300;

const TOPIC_SUMMARIZATION_PROMPT: &str = r#"You are a superpowerful summarization AI model.

Your task is to summarize a list of paragraphs and extract the topic in common to ALL paragraphs.
- Your answer must be 3 to 5 words at most.
- The summary must be written in {language}.

All the information about the topic is delimited with  <topic></topic> tags.
The paragraphs will be separated with "----------".
Here is the list of paragraphs:
<topic>
{topics_elements}
</topic>

Make sure to only return the summary as a valid string, starting and ending with quotes."#;

/// Configuration for a [`KnowledgeBase`], fixed at construction.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseOptions {
    /// Columns folded into document content; all non-id columns if unset
    pub knowledge_base_columns: Option<Vec<String>>,
    /// Neighbors retrieved when assembling a context around a seed
    pub context_neighbors: usize,
    /// Squared-L2 distance bound; neighbors at or above it are dropped
    pub context_similarity_threshold: f32,
    /// Seed for the knowledge base's random generator
    pub seed: Option<u64>,
    /// Embedding model identifier passed to the provider
    pub embedding_model: String,
    /// Minimum documents per topic; `round(2 + ln(n))` if unset
    pub min_topic_size: Option<usize>,
    /// Batch size for embedding calls
    pub chunk_size: usize,
    /// 2D projection parameters
    pub projection: ProjectionConfig,
}

impl Default for KnowledgeBaseOptions {
    fn default() -> Self {
        Self {
            knowledge_base_columns: None,
            context_neighbors: 4,
            context_similarity_threshold: 0.2,
            seed: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            min_topic_size: None,
            chunk_size: 2048,
            projection: ProjectionConfig::default(),
        }
    }
}

impl KnowledgeBaseOptions {
    /// Restrict the content columns
    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.knowledge_base_columns = Some(columns);
        self
    }

    /// Set the context neighbor count
    #[must_use]
    pub fn with_context_neighbors(mut self, context_neighbors: usize) -> Self {
        self.context_neighbors = context_neighbors;
        self
    }

    /// Set the context similarity threshold
    #[must_use]
    pub fn with_context_similarity_threshold(mut self, threshold: f32) -> Self {
        self.context_similarity_threshold = threshold;
        self
    }

    /// Seed the random generator for reproducible sampling
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the embedding model identifier
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the minimum topic size
    #[must_use]
    pub fn with_min_topic_size(mut self, min_topic_size: usize) -> Self {
        self.min_topic_size = Some(min_topic_size);
        self
    }

    /// Set the embedding batch size
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Exportable knowledge-base state (configuration plus topic assignments).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct KnowledgeBaseState {
    /// Content columns, when restricted
    pub knowledge_base_columns: Option<Vec<String>>,
    /// Context neighbor count
    pub context_neighbors: usize,
    /// Context similarity threshold
    pub context_similarity_threshold: f32,
    /// Embedding model identifier
    pub embedding_model: String,
    /// Minimum topic size
    pub min_topic_size: usize,
    /// Topic id to human-readable name
    pub topics: BTreeMap<i64, String>,
    /// One topic id per document, in document order
    pub documents_topics: Vec<i64>,
}

/// A seed document's similarity-filtered neighborhood.
#[derive(Debug, Clone)]
pub struct DocumentGroup {
    /// Id of the sampled seed document
    pub seed_document_id: i64,
    /// Topic id of the seed document
    pub topic_id: i64,
    /// Neighbors below the similarity threshold; may be empty
    pub documents: Vec<Arc<Document>>,
}

/// The knowledge base and its associated vector store.
pub struct KnowledgeBase {
    documents: Vec<Arc<Document>>,
    documents_by_id: HashMap<i64, Arc<Document>>,
    options: KnowledgeBaseOptions,
    min_topic_size: usize,
    language: String,
    rng: Mutex<StdRng>,
    embedder: Arc<dyn Embeddings>,
    llm: Arc<dyn ChatModel>,
    embeddings_cache: OnceCell<Vec<Vec<f32>>>,
    index_cache: OnceCell<FlatL2Index>,
    reduced_cache: OnceCell<Vec<[f32; 2]>>,
    topics_cache: OnceCell<BTreeMap<i64, String>>,
}

impl KnowledgeBase {
    /// Build a knowledge base from tabular input.
    ///
    /// Fails on an empty table, on duplicate document ids, and on content
    /// columns that do not exist in the table.
    pub fn new(
        table: KnowledgeTable,
        embedder: Arc<dyn Embeddings>,
        llm: Arc<dyn ChatModel>,
        options: KnowledgeBaseOptions,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::configuration(
                "cannot build a knowledge base from an empty table",
            ));
        }

        let features = match &options.knowledge_base_columns {
            Some(columns) => {
                for column in columns {
                    if !table.columns().contains(column) {
                        return Err(Error::configuration(format!(
                            "knowledge base column '{column}' does not exist in the table"
                        )));
                    }
                }
                columns.clone()
            }
            None => table
                .columns()
                .iter()
                .filter(|c| c.as_str() != ID_COLUMN)
                .cloned()
                .collect(),
        };
        if features.is_empty() {
            return Err(Error::configuration(
                "no content columns left after excluding the id column",
            ));
        }

        let documents: Vec<Arc<Document>> = table
            .rows()
            .iter()
            .enumerate()
            .map(|(position, row)| {
                Document::from_record(row.clone(), &features, position).map(Arc::new)
            })
            .collect::<Result<_>>()?;

        let mut documents_by_id = HashMap::with_capacity(documents.len());
        for doc in &documents {
            if documents_by_id.insert(doc.id(), Arc::clone(doc)).is_some() {
                return Err(Error::configuration(format!(
                    "duplicate document id {}",
                    doc.id()
                )));
            }
        }

        let min_topic_size = options
            .min_topic_size
            .unwrap_or_else(|| (2.0 + (documents.len() as f64).ln()).round() as usize);

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let language = Self::detect_dominant_language(&documents, &mut rng);
        debug!(language = %language, documents = documents.len(), "knowledge base ready");

        Ok(Self {
            documents,
            documents_by_id,
            options,
            min_topic_size,
            language,
            rng: Mutex::new(rng),
            embedder,
            llm,
            embeddings_cache: OnceCell::new(),
            index_cache: OnceCell::new(),
            reduced_cache: OnceCell::new(),
            topics_cache: OnceCell::new(),
        })
    }

    fn detect_dominant_language(documents: &[Arc<Document>], rng: &mut StdRng) -> String {
        let detections = (0..LANGUAGE_SAMPLE_SIZE).map(|_| {
            let doc = &documents[rng.gen_range(0..documents.len())];
            let snippet: String = doc.content().chars().take(LANGUAGE_SNIPPET_CHARS).collect();
            language::detect_language(&snippet)
        });
        language::majority_language(detections)
    }

    /// All documents, in input order
    #[must_use]
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    /// Look up a document by id
    #[must_use]
    pub fn document(&self, id: i64) -> Option<&Arc<Document>> {
        self.documents_by_id.get(&id)
    }

    /// Number of documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Always false: construction rejects empty tables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Dominant language of the knowledge base (ISO 639-1)
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Configured context neighbor count
    #[must_use]
    pub fn context_neighbors(&self) -> usize {
        self.options.context_neighbors
    }

    /// Configured context similarity threshold
    #[must_use]
    pub fn context_similarity_threshold(&self) -> f32 {
        self.options.context_similarity_threshold
    }

    /// Effective minimum topic size
    #[must_use]
    pub fn min_topic_size(&self) -> usize {
        self.min_topic_size
    }

    /// Document embeddings, computed once and cached.
    ///
    /// Contents are batched through the embedding provider in chunks of the
    /// configured size; each vector is also assigned onto its document.
    /// Provider failures propagate unmodified.
    pub async fn embeddings(&self) -> Result<&[Vec<f32>]> {
        let vectors = self
            .embeddings_cache
            .get_or_try_init(|| async {
                let texts: Vec<String> = self
                    .documents
                    .iter()
                    .map(|d| d.content().to_string())
                    .collect();
                debug!(
                    documents = texts.len(),
                    chunk_size = self.options.chunk_size,
                    model = %self.options.embedding_model,
                    "computing document embeddings"
                );

                let mut all = Vec::with_capacity(texts.len());
                for chunk in texts.chunks(self.options.chunk_size.max(1)) {
                    let vectors = self
                        .embedder
                        .embed_documents(chunk, &self.options.embedding_model)
                        .await?;
                    if vectors.len() != chunk.len() {
                        return Err(Error::provider(format!(
                            "embedding provider returned {} vectors for {} texts",
                            vectors.len(),
                            chunk.len()
                        )));
                    }
                    all.extend(vectors);
                }

                for (doc, embedding) in self.documents.iter().zip(&all) {
                    doc.set_embedding(embedding.clone());
                }
                Ok(all)
            })
            .await?;
        Ok(vectors)
    }

    /// The exact L2 index over document embeddings, built lazily.
    async fn index(&self) -> Result<&FlatL2Index> {
        self.index_cache
            .get_or_try_init(|| async {
                let embeddings = self.embeddings().await?;
                let dimension = embeddings.first().map_or(0, Vec::len);
                let mut index = FlatL2Index::new(dimension)?;
                index.add(embeddings)?;
                Ok(index)
            })
            .await
    }

    /// 2D projection of the embedding matrix, computed once and cached.
    pub async fn reduced_embeddings(&self) -> Result<&[[f32; 2]]> {
        let reduced = self
            .reduced_cache
            .get_or_try_init(|| async {
                let embeddings = self.embeddings().await?;
                projection::reduce_to_2d(embeddings, &self.options.projection)
            })
            .await?;
        Ok(reduced)
    }

    /// Topic id to name mapping, computed once and cached.
    ///
    /// Triggers embedding and projection computation as needed. Every
    /// document receives its topic id; the noise entry
    /// ([`NOISE_TOPIC_ID`] → "Others") is always present.
    pub async fn topics(&self) -> Result<&BTreeMap<i64, String>> {
        self.topics_cache
            .get_or_try_init(|| async { self.find_topics().await })
            .await
    }

    async fn find_topics(&self) -> Result<BTreeMap<i64, String>> {
        let reduced = self.reduced_embeddings().await?;
        let params = ClusteringParams {
            min_cluster_size: self.min_topic_size,
            min_samples: 3,
            cluster_selection_epsilon: 0.0,
        };
        debug!(
            min_cluster_size = params.min_cluster_size,
            "clustering documents into topics"
        );
        let labels = clustering::cluster_topics(reduced, &params)?;

        for (doc, &label) in self.documents.iter().zip(&labels) {
            doc.set_topic_id(label);
        }

        let cluster_ids: HashSet<i64> = labels.iter().copied().collect();
        let mut topics = BTreeMap::new();
        for cluster_id in cluster_ids {
            if cluster_id == NOISE_TOPIC_ID {
                continue;
            }
            let members: Vec<Arc<Document>> = self
                .documents
                .iter()
                .zip(&labels)
                .filter(|(_, &label)| label == cluster_id)
                .map(|(doc, _)| Arc::clone(doc))
                .collect();
            let name = self.generate_topic_name(members).await?;
            topics.insert(cluster_id, name);
        }
        topics.insert(NOISE_TOPIC_ID, OTHERS_TOPIC_NAME.to_string());
        Ok(topics)
    }

    async fn generate_topic_name(&self, mut members: Vec<Arc<Document>>) -> Result<String> {
        members.shuffle(&mut *self.rng.lock());
        let elements = members
            .iter()
            .map(|doc| format!("----------{}", doc.content()))
            .collect::<Vec<_>>()
            .join("\n\n");
        let elements = truncate_chars(&elements, TOPIC_CONTEXT_BUDGET);

        let prompt = format_fstring(
            TOPIC_SUMMARIZATION_PROMPT,
            &vars([
                ("language", self.language.as_str()),
                ("topics_elements", elements.as_str()),
            ]),
        )?;

        debug!(documents = members.len(), "naming topic");
        let result = self
            .llm
            .complete(
                &[Message::human(prompt)],
                &CompletionOptions::with_temperature(0.0),
            )
            .await?;
        Ok(strip_wrapping_quotes(result.text().trim()).to_string())
    }

    /// Embed a query and return its `k` nearest documents with squared-L2
    /// distances, nearest first.
    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Arc<Document>, f32)>> {
        let query_embedding = self
            .embedder
            .embed_query(query, &self.options.embedding_model)
            .await?;
        self.vector_similarity_search_with_score(&query_embedding, k)
            .await
    }

    /// Return the `k` documents nearest to `query_embedding` with their
    /// squared-L2 distances, nearest first, ties stable by document order.
    pub async fn vector_similarity_search_with_score(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(Arc<Document>, f32)>> {
        let hits = self.index().await?.search(query_embedding, k)?;
        Ok(hits
            .into_iter()
            .map(|(position, distance)| (Arc::clone(&self.documents[position]), distance))
            .collect())
    }

    /// Uniformly sample one document with the knowledge base's seeded
    /// generator.
    #[must_use]
    pub fn random_document(&self) -> Arc<Document> {
        let position = self.rng.lock().gen_range(0..self.documents.len());
        Arc::clone(&self.documents[position])
    }

    /// Sample a seed document and return its similarity-filtered
    /// neighborhood plus its topic id.
    ///
    /// Neighbors at or above the similarity threshold are dropped, so the
    /// group may hold fewer than `context_neighbors` documents, or none.
    /// Triggers topic computation on first use.
    pub async fn random_document_group(&self) -> Result<DocumentGroup> {
        self.topics().await?;
        self.embeddings().await?;

        let seed = self.random_document();
        let seed_embedding = seed.embedding().ok_or_else(|| {
            Error::provider("seed document has no embedding after embedding computation")
        })?;

        let neighbors = self
            .vector_similarity_search_with_score(seed_embedding, self.options.context_neighbors)
            .await?;
        let documents = neighbors
            .into_iter()
            .filter(|(_, score)| *score < self.options.context_similarity_threshold)
            .map(|(doc, _)| doc)
            .collect();

        Ok(DocumentGroup {
            seed_document_id: seed.id(),
            topic_id: seed.topic_id().unwrap_or(NOISE_TOPIC_ID),
            documents,
        })
    }

    /// Exportable configuration and topic assignments.
    ///
    /// Triggers topic computation if it has not run yet.
    pub async fn savable_data(&self) -> Result<KnowledgeBaseState> {
        let topics = self.topics().await?.clone();
        let documents_topics = self
            .documents
            .iter()
            .map(|doc| doc.topic_id().unwrap_or(NOISE_TOPIC_ID))
            .collect();
        Ok(KnowledgeBaseState {
            knowledge_base_columns: self.options.knowledge_base_columns.clone(),
            context_neighbors: self.options.context_neighbors,
            context_similarity_threshold: self.options.context_similarity_threshold,
            embedding_model: self.options.embedding_model.clone(),
            min_topic_size: self.min_topic_size,
            topics,
            documents_topics,
        })
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_models::FakeChatModel;
    use crate::embeddings::MockEmbeddings;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeddings stub with fixed per-text vectors and a call counter.
    struct StaticEmbeddings {
        vectors: HashMap<String, Vec<f32>>,
        batches: Mutex<Vec<usize>>,
        calls: AtomicUsize,
    }

    impl StaticEmbeddings {
        fn new(entries: &[(&str, &[f32])]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.to_vec()))
                    .collect(),
                batches: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embeddings for StaticEmbeddings {
        async fn embed_documents(&self, texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().push(texts.len());
            texts
                .iter()
                .map(|t| {
                    self.vectors
                        .get(t)
                        .cloned()
                        .ok_or_else(|| Error::provider(format!("no vector for '{t}'")))
                })
                .collect()
        }
    }

    fn table(texts: &[&str]) -> KnowledgeTable {
        KnowledgeTable::from_texts(texts.iter().map(|t| t.to_string()))
    }

    fn mock_kb(texts: &[&str], seed: u64) -> KnowledgeBase {
        KnowledgeBase::new(
            table(texts),
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec!["\"Some topic\"".to_string()])),
            KnowledgeBaseOptions::default().with_seed(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_table_rejected() {
        let result = KnowledgeBase::new(
            KnowledgeTable::from_texts(Vec::<String>::new()),
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default(),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let rows = vec![
            HashMap::from([("id".to_string(), json!(1)), ("text".to_string(), json!("a"))]),
            HashMap::from([("id".to_string(), json!(1)), ("text".to_string(), json!("b"))]),
        ];
        let table = KnowledgeTable::new(vec!["id".into(), "text".into()], rows).unwrap();
        let result = KnowledgeBase::new(
            table,
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default(),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_ids_default_to_row_position() {
        let kb = mock_kb(&["a", "b", "c"], 0);
        let ids: Vec<i64> = kb.documents().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(kb.document(1).unwrap().content(), "b");
    }

    #[test]
    fn test_unknown_configured_column_rejected() {
        let result = KnowledgeBase::new(
            table(&["a"]),
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default().with_columns(vec!["missing".to_string()]),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_min_topic_size_derivation() {
        let texts: Vec<&str> = std::iter::repeat("doc").take(20).collect();
        let kb = mock_kb(&texts, 0);
        // round(2 + ln(20)) = round(4.996) = 5
        assert_eq!(kb.min_topic_size(), 5);

        let kb = KnowledgeBase::new(
            table(&["a", "b"]),
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default().with_min_topic_size(7),
        )
        .unwrap();
        assert_eq!(kb.min_topic_size(), 7);
    }

    #[test]
    fn test_language_detection_defaults_to_english() {
        let kb = mock_kb(&["short", "tiny", "words"], 0);
        assert_eq!(kb.language(), "en");
    }

    #[tokio::test]
    async fn test_embeddings_batched_and_cached() {
        let provider = Arc::new(StaticEmbeddings::new(&[
            ("a", &[0.0, 0.0]),
            ("b", &[1.0, 0.0]),
            ("c", &[0.0, 1.0]),
            ("d", &[1.0, 1.0]),
            ("e", &[2.0, 2.0]),
        ]));
        let kb = KnowledgeBase::new(
            table(&["a", "b", "c", "d", "e"]),
            Arc::clone(&provider) as Arc<dyn Embeddings>,
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default().with_seed(1).with_chunk_size(2),
        )
        .unwrap();

        let first = kb.embeddings().await.unwrap().to_vec();
        let _ = kb.embeddings().await.unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(*provider.batches.lock(), vec![2, 2, 1]);
        // Second access is served from the cache.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        // Vectors were assigned back onto the documents.
        assert_eq!(kb.documents()[1].embedding(), Some([1.0, 0.0].as_slice()));
    }

    #[tokio::test]
    async fn test_similarity_search_ordering_and_distances() {
        let provider = Arc::new(StaticEmbeddings::new(&[
            ("a", &[0.0, 0.0]),
            ("b", &[1.0, 0.0]),
            ("c", &[0.0, 3.0]),
        ]));
        let kb = KnowledgeBase::new(
            table(&["a", "b", "c"]),
            provider as Arc<dyn Embeddings>,
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default().with_seed(1),
        )
        .unwrap();

        let hits = kb
            .vector_similarity_search_with_score(&[0.0, 0.0], 3)
            .await
            .unwrap();
        let contents: Vec<&str> = hits.iter().map(|(d, _)| d.content()).collect();
        let scores: Vec<f32> = hits.iter().map(|(_, s)| *s).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(scores, vec![0.0, 1.0, 9.0]);
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_random_document_group_filters_by_threshold() {
        // "far" sits at squared distance 100 from everything else.
        let provider = Arc::new(StaticEmbeddings::new(&[
            ("a", &[0.0, 0.0]),
            ("b", &[0.1, 0.0]),
            ("far", &[10.0, 0.0]),
        ]));
        let kb = KnowledgeBase::new(
            table(&["a", "b", "far"]),
            provider as Arc<dyn Embeddings>,
            Arc::new(FakeChatModel::new(vec!["\"Topic\"".to_string(); 4])),
            KnowledgeBaseOptions::default()
                .with_seed(3)
                .with_context_similarity_threshold(0.2)
                .with_min_topic_size(2),
        )
        .unwrap();

        for _ in 0..5 {
            let group = kb.random_document_group().await.unwrap();
            for doc in &group.documents {
                let embedding = doc.embedding().unwrap();
                let seed = kb.document(group.seed_document_id).unwrap();
                let seed_embedding = seed.embedding().unwrap();
                let d2: f32 = embedding
                    .iter()
                    .zip(seed_embedding)
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum();
                assert!(d2 < 0.2, "neighbor at distance {d2} breached the threshold");
            }
        }
    }

    #[tokio::test]
    async fn test_random_document_determinism() {
        let kb1 = mock_kb(&["a", "b", "c", "d", "e"], 42);
        let kb2 = mock_kb(&["a", "b", "c", "d", "e"], 42);
        let picks1: Vec<i64> = (0..10).map(|_| kb1.random_document().id()).collect();
        let picks2: Vec<i64> = (0..10).map(|_| kb2.random_document().id()).collect();
        assert_eq!(picks1, picks2);
    }

    #[tokio::test]
    async fn test_topics_complete_and_noise_labeled() {
        let texts: Vec<String> = (0..12).map(|i| format!("document number {i}")).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let kb = KnowledgeBase::new(
            table(&text_refs),
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec!["\"Numbered documents\"".to_string(); 8])),
            KnowledgeBaseOptions::default().with_seed(5).with_min_topic_size(2),
        )
        .unwrap();

        let topics = kb.topics().await.unwrap();
        assert_eq!(topics.get(&NOISE_TOPIC_ID).map(String::as_str), Some("Others"));
        for doc in kb.documents() {
            let topic_id = doc.topic_id().expect("every document gets a topic");
            assert!(topics.contains_key(&topic_id));
        }
    }

    #[tokio::test]
    async fn test_topic_names_have_quotes_stripped() {
        assert_eq!(strip_wrapping_quotes("\"Car manual\""), "Car manual");
        assert_eq!(strip_wrapping_quotes("'Car manual'"), "Car manual");
        assert_eq!(strip_wrapping_quotes("Car manual"), "Car manual");
        assert_eq!(strip_wrapping_quotes("\"unbalanced"), "\"unbalanced");
    }

    #[tokio::test]
    async fn test_savable_data_shape() {
        let kb = KnowledgeBase::new(
            table(&["a", "b", "c", "d"]),
            Arc::new(MockEmbeddings::new()),
            Arc::new(FakeChatModel::new(vec!["\"Topic\"".to_string(); 4])),
            KnowledgeBaseOptions::default()
                .with_seed(9)
                .with_min_topic_size(2)
                .with_embedding_model("test-model"),
        )
        .unwrap();

        let state = kb.savable_data().await.unwrap();
        assert_eq!(state.embedding_model, "test-model");
        assert_eq!(state.documents_topics.len(), 4);
        assert!(state.topics.contains_key(&NOISE_TOPIC_ID));
        for topic_id in &state.documents_topics {
            assert!(state.topics.contains_key(topic_id));
        }

        // Round-trips through JSON.
        let json = serde_json::to_string(&state).unwrap();
        let back: KnowledgeBaseState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.documents_topics, state.documents_topics);
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = Arc::new(StaticEmbeddings::new(&[("a", &[0.0])]));
        let kb = KnowledgeBase::new(
            table(&["a", "unknown text"]),
            provider as Arc<dyn Embeddings>,
            Arc::new(FakeChatModel::new(vec![])),
            KnowledgeBaseOptions::default().with_seed(1),
        )
        .unwrap();
        let err = kb.embeddings().await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
