pub mod compressor;
pub mod repeat_window;

pub use compressor::{compress, CompressInputs};
pub use repeat_window::RepeatWindowManager;
