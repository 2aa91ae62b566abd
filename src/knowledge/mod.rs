pub mod store;

pub use store::{KnowledgeSource, KnowledgeStore};
