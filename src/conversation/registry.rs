//! Per-conversation `ResearchState` registry (§3 "Lifecycle", §9 "Dynamic
//! shapes across state values": "Derive a per-conversation registry keyed by
//! (user_id, first_message_id)"). Generalizes the teacher's flat
//! `HashMap`-backed registry pattern (`core/tools_registry.rs::ToolRegistry`,
//! deleted in the final trim; see DESIGN.md's Trimming log)
//! to a concurrent, per-key-locked store of [`ResearchState`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::core::error::{EngineError, EngineResult};
use crate::core::types::ResearchState;

/// `(user_id, first_message_id)` — the engine refuses to mix states across
/// conversations (§3).
pub type ConversationKey = (String, String);

/// Each conversation is exclusively owned by its key; the registry holds a
/// per-key lock only for the lifetime of create/delete/lookup operations,
/// never across a caller's full cycle (§5 "Shared resources").
#[derive(Default)]
pub struct ConversationRegistry {
    states: AsyncMutex<HashMap<ConversationKey, Arc<AsyncMutex<ResearchState>>>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        ConversationRegistry { states: AsyncMutex::new(HashMap::new()) }
    }

    /// Returns the existing state for `key`, or creates one seeded with
    /// `original_question` if absent.
    pub async fn get_or_create(&self, key: ConversationKey, original_question: &str) -> Arc<AsyncMutex<ResearchState>> {
        let mut states = self.states.lock().await;
        if let Some(existing) = states.get(&key) {
            return existing.clone();
        }
        debug!("creating research state for conversation {:?}", key);
        let state = Arc::new(AsyncMutex::new(ResearchState::new(original_question.to_string())));
        states.insert(key, state.clone());
        state
    }

    /// Returns the state for `key` if one exists, erroring if the caller
    /// expected a conversation that was never created — callers must not
    /// silently synthesize a fresh state mid-research (§3 "refuses to mix
    /// states across conversations").
    pub async fn get(&self, key: &ConversationKey) -> EngineResult<Arc<AsyncMutex<ResearchState>>> {
        self.states
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::State(format!("no research state for conversation {key:?}")))
    }

    /// Removes a completed or abandoned conversation's state.
    pub async fn remove(&self, key: &ConversationKey) {
        self.states.lock().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.states.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_returns_same_state_on_repeat_calls() {
        let registry = ConversationRegistry::new();
        let key = ("user-1".to_string(), "msg-1".to_string());
        let a = registry.get_or_create(key.clone(), "q1").await;
        let b = registry.get_or_create(key.clone(), "different question").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.lock().await.original_question, "q1");
    }

    #[tokio::test]
    async fn get_errors_for_unknown_conversation() {
        let registry = ConversationRegistry::new();
        let key = ("u".to_string(), "m".to_string());
        assert!(registry.get(&key).await.is_err());
    }

    #[tokio::test]
    async fn distinct_keys_get_distinct_states() {
        let registry = ConversationRegistry::new();
        let a = registry.get_or_create(("u1".to_string(), "m1".to_string()), "qa").await;
        let b = registry.get_or_create(("u2".to_string(), "m1".to_string()), "qb").await;
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().await, 2);
    }
}
