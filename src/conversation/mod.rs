pub mod registry;

pub use registry::{ConversationKey, ConversationRegistry};
