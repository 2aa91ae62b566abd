pub mod counter;

pub use counter::TokenCounter;
