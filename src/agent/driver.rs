//! Conversation driver: offer the discovered tools to the model, run the
//! tools it picks, and hand the results back.
//!
//! 1. Obtain a credential (abort on failure)
//! 2. Fetch the authenticated manifest and translate it
//! 3. Ask the model, with the tools attached
//! 4. Execute requested tools and reply with their results
//! 5. Repeat 3-4 up to `max_tool_rounds`, then return the final answer

use crate::bedrock::ConverseClient;
use crate::config::ProbeConfig;
use crate::identity::TokenProvider;
use crate::tools::{self, ToolContext};
use crate::types::*;
use crate::utcp::{ManifestClient, ToolInvoker};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Everything a finished conversation produced.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationOutcome {
    pub final_text: Option<String>,
    pub tools_offered: usize,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub rounds: u32,
    /// Why the model stopped on the last call (`end_turn`, `tool_use`, ...).
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
    pub cost_estimate_usd: f64,
}

/// Prompt used when the caller does not supply one.
pub fn default_prompt(token: &str) -> String {
    format!(
        "Can you call the protected endpoint using this JWT token: {}",
        token
    )
}

/// Run one conversation against the model.
pub async fn run_conversation(
    config: &ProbeConfig,
    tokens: &dyn TokenProvider,
    manifests: &ManifestClient,
    invoker: &ToolInvoker,
    model: &ConverseClient,
    prompt: Option<&str>,
) -> Result<ConversationOutcome> {
    let token = tokens
        .access_token()
        .await
        .context("Failed to get access token")?;

    let manifest = manifests
        .fetch(Some(&token))
        .await
        .context("Failed to fetch tool manifest")?;
    let tool_defs = tools::translate(&manifest);
    info!("Discovered {} tools from UTCP endpoint", tool_defs.len());

    // The model passes the token back as an `authorization` argument.
    let tool_ctx = ToolContext {
        invoker,
        manifest: &manifest,
        credential: None,
    };

    let prompt = prompt
        .map(str::to_string)
        .unwrap_or_else(|| default_prompt(&token));
    let mut messages = vec![ChatMessage::user_text(prompt)];

    let mut usage = TokenUsage::default();
    let mut all_calls = Vec::new();
    let mut all_results = Vec::new();
    let mut rounds = 0;
    let system = config.system_prompt.as_deref();

    let mut response = model
        .converse(&config.model_id, system, &messages, &tool_defs, config.max_tokens)
        .await?;
    usage.add(&response.usage);
    debug!("Model stop reason: {:?}", response.stop_reason);

    while !response.tool_calls.is_empty() && rounds < config.max_tool_rounds {
        rounds += 1;
        messages.push(response.message.clone());

        let mut results = Vec::new();
        for tc in &response.tool_calls {
            info!("[Round {}] Model wants tool: {}({})", rounds, tc.name, tc.arguments);

            let mut result = tools::execute_tool(&tool_ctx, &tc.name, &tc.arguments).await;
            result.tool_call_id = tc.id.clone();

            if result.success {
                info!("[Round {}] Tool result: {} chars", rounds, result.output.len());
            } else {
                warn!("[Round {}] Tool error: {}", rounds, result.output);
            }
            results.push(result);
        }

        all_calls.extend(response.tool_calls.iter().cloned());
        all_results.extend(results.iter().cloned());
        messages.push(ChatMessage::tool_results(results));

        response = model
            .converse(&config.model_id, system, &messages, &tool_defs, config.max_tokens)
            .await?;
        usage.add(&response.usage);
        debug!("[Round {}] Model stop reason: {:?}", rounds, response.stop_reason);
    }

    if !response.tool_calls.is_empty() {
        warn!(
            "Model still requested {} tool(s) after {} round(s); stopping",
            response.tool_calls.len(),
            rounds
        );
    }

    let cost_estimate_usd = ConverseClient::estimate_cost(&config.model_id, &usage);

    Ok(ConversationOutcome {
        final_text: response.content,
        tools_offered: tool_defs.len(),
        tool_calls: all_calls,
        tool_results: all_results,
        rounds,
        stop_reason: response.stop_reason,
        usage,
        cost_estimate_usd,
    })
}
