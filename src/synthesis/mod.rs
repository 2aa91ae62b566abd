pub mod citation;
pub mod engine;
pub mod llm;

pub use citation::CitationVerifier;
pub use engine::SynthesisEngine;
pub use llm::{ChatClient, ChatMessage, ModelKind};
