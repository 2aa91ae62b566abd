pub mod controller;
pub mod feedback;

pub use controller::{CycleController, CyclePhase, ResearchOutcome};
pub use feedback::{FeedbackCommand, FeedbackProcessor};
