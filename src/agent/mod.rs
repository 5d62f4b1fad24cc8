pub mod driver;

pub use driver::{run_conversation, ConversationOutcome};
