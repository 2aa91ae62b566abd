pub mod app_state;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use app_state::EngineState;
pub use config::{load_engine_config, EngineConfig};
pub use error::{EngineError, EngineResult};
