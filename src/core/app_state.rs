use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

use crate::conversation::registry::ConversationRegistry;
use crate::embedding::client::EmbeddingClient;
use crate::fetch::ratelimit::DomainRateLimiter;
use crate::knowledge::store::KnowledgeStore;
use crate::synthesis::llm::ChatClient;
use crate::tokens::counter::TokenCounter;

use super::config::EngineConfig;
use super::types::Embedding;

/// Process-wide shared state: the caches, rate limiter, provider clients,
/// and conversation registry every subsystem is threaded through by `Arc`,
/// constructed once at startup (§3 "Lifecycle", §5 "Shared resources").
/// Mirrors the teacher's `AppState`.
#[derive(Clone)]
pub struct EngineState {
    pub http_client: reqwest::Client,
    pub config: Arc<EngineConfig>,

    pub embedding_client: Arc<EmbeddingClient>,
    pub token_counter: Arc<TokenCounter>,
    pub chat_client: Arc<ChatClient>,
    pub knowledge_store: Arc<KnowledgeStore>,

    /// text-hash -> Embedding
    pub embedding_cache: moka::future::Cache<String, Embedding>,
    /// (text_hash, transform_id) -> Embedding
    pub transform_cache: moka::future::Cache<(String, String), Embedding>,
    /// (hash_a, hash_b) -> cosine similarity
    pub similarity_cache: moka::future::Cache<(String, String), f32>,
    /// url -> fetched text, capped at 3x max-result-tokens per §4.D
    pub fetch_cache: moka::future::Cache<String, Arc<String>>,

    pub domain_rate_limiter: Arc<DomainRateLimiter>,
    pub outbound_limit: Arc<Semaphore>,
    pub conversations: Arc<ConversationRegistry>,

    /// Per-domain cookie jars, keyed by domain; a short critical section
    /// guards the read-compute-delay-write sequence together with the rate
    /// limiter (§9 Design Note "Rate-limit map").
    pub cookie_jars: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineState")
            .field("research_model", &self.config.research_model)
            .field("max_cycles", &self.config.max_cycles)
            .finish()
    }
}

impl EngineState {
    pub fn new(http_client: reqwest::Client, config: EngineConfig) -> Self {
        let outbound_limit = env::var("OUTBOUND_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(16);

        let config = Arc::new(config);

        let embedding_client =
            Arc::new(EmbeddingClient::new(http_client.clone(), config.clone()));
        let token_counter = Arc::new(TokenCounter::new(http_client.clone(), config.clone()));
        let chat_client = Arc::new(ChatClient::new(http_client.clone(), config.clone()));
        let knowledge_store = Arc::new(KnowledgeStore::new(config.clone(), embedding_client.clone()));

        EngineState {
            http_client,
            config,
            embedding_client,
            token_counter,
            chat_client,
            knowledge_store,
            embedding_cache: moka::future::Cache::builder()
                .max_capacity(50_000)
                .time_to_live(std::time::Duration::from_secs(60 * 60))
                .build(),
            transform_cache: moka::future::Cache::builder()
                .max_capacity(50_000)
                .time_to_live(std::time::Duration::from_secs(60 * 60))
                .build(),
            similarity_cache: moka::future::Cache::builder()
                .max_capacity(100_000)
                .time_to_live(std::time::Duration::from_secs(60 * 30))
                .build(),
            fetch_cache: moka::future::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(std::time::Duration::from_secs(60 * 30))
                .build(),
            domain_rate_limiter: Arc::new(DomainRateLimiter::new()),
            outbound_limit: Arc::new(Semaphore::new(outbound_limit)),
            conversations: Arc::new(ConversationRegistry::new()),
            cookie_jars: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
