//! utcp-probe: tiered UTCP tool discovery client.
//!
//! Signs in through Cognito, discovers tools from a UTCP manifest endpoint,
//! invokes them over HTTP, and lets a Bedrock-hosted Claude model drive
//! them through tool calling.

pub mod agent;
pub mod bedrock;
pub mod config;
pub mod identity;
pub mod probe;
pub mod tools;
pub mod types;
pub mod utcp;
