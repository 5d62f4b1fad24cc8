//! UTCP tool discovery and invocation.

pub mod client;
pub mod discovery;
pub mod error;
pub mod invoker;
pub mod manifest;

pub use client::ManifestClient;
pub use discovery::DiscoveryComparison;
pub use error::{FetchError, InvokeError};
pub use invoker::{AuthHeader, Invocation, ToolInvoker};
pub use manifest::{AuthLocation, ProviderAuth, ToolDescriptor, ToolManifest, ToolProvider};
