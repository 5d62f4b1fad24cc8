pub mod traits;

pub use traits::ToolDefinition;

use crate::types::ToolResult;
use crate::utcp::{InvokeError, ToolInvoker, ToolManifest};

// ---------------------------------------------------------------------------
// Tool definitions for the inference API
// ---------------------------------------------------------------------------

/// Translate a manifest into tool definitions, one per descriptor, in order.
pub fn translate(manifest: &ToolManifest) -> Vec<ToolDefinition> {
    manifest.tools.iter().map(ToolDefinition::from).collect()
}

/// Text handed to the model when it asks for a tool the manifest lacks.
pub fn not_found_message(name: &str) -> String {
    format!("Tool {} not found", name)
}

// ---------------------------------------------------------------------------
// Tool execution
// ---------------------------------------------------------------------------

/// Context passed to tool execution.
pub struct ToolContext<'a> {
    pub invoker: &'a ToolInvoker,
    pub manifest: &'a ToolManifest,
    /// Credential injected into tools that declare header auth.
    pub credential: Option<String>,
}

/// Execute a tool call by name.
///
/// Never fails: unknown tools and transport errors become unsuccessful
/// results with a message the model can read.
pub async fn execute_tool(
    ctx: &ToolContext<'_>,
    name: &str,
    args: &serde_json::Value,
) -> ToolResult {
    let result = ctx
        .invoker
        .invoke(ctx.manifest, name, args, ctx.credential.as_deref())
        .await;

    match result {
        Ok(invocation) => ToolResult {
            tool_call_id: String::new(), // Set by caller
            success: invocation.is_success(),
            output: invocation.body,
        },
        Err(InvokeError::NotFound(_)) => ToolResult {
            tool_call_id: String::new(),
            output: not_found_message(name),
            success: false,
        },
        Err(e) => ToolResult {
            tool_call_id: String::new(),
            output: format!("Error: {}", e),
            success: false,
        },
    }
}
