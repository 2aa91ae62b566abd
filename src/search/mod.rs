pub mod orchestrator;
pub mod prioritizer;
pub mod providers;
pub mod quality;

pub use orchestrator::SearchOrchestrator;
pub use prioritizer::TopicPrioritizer;
pub use quality::QualityFilter;
