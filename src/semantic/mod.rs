pub mod dimension;
pub mod pdv;
pub mod trajectory;
pub mod transformer;

pub use dimension::DimensionTracker;
pub use pdv::{compute_pdv, PdvResult};
pub use trajectory::TrajectoryAccumulator;
pub use transformer::SemanticTransformer;
