pub mod chunk;
pub mod compress;
pub mod conversation;
pub mod core;
pub mod cycle;
pub mod embedding;
pub mod export;
pub mod fetch;
pub mod knowledge;
pub mod search;
pub mod semantic;
pub mod sources;
pub mod synthesis;
pub mod tokens;

pub use core::app_state::EngineState;
pub use core::config::{load_engine_config, EngineConfig};
pub use core::error::{EngineError, EngineResult};
pub use core::types;
pub use core::types::*;
pub use cycle::{CycleController, CyclePhase, FeedbackCommand, FeedbackProcessor, ResearchOutcome};
pub use synthesis::{CitationVerifier, SynthesisEngine};
