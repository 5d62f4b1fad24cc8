pub mod converse;

pub use converse::{tool_config, BedrockAuth, ConverseClient};
