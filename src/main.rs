//! utcp-probe: tiered UTCP discovery client.
//!
//! Usage:
//!   utcp-probe discover [--auth]       List tools from the manifest endpoint
//!   utcp-probe tools [--auth]          Print the tools as Bedrock toolSpecs
//!   utcp-probe invoke <name> [--auth]  Call one tool
//!   utcp-probe probe [--strict]        Run the tiered discovery scenario
//!   utcp-probe converse                Let Claude on Bedrock call the tools

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use utcp_probe::agent;
use utcp_probe::bedrock::{self, ConverseClient};
use utcp_probe::config::{self, ProbeConfig};
use utcp_probe::identity::{CognitoAuth, TokenProvider};
use utcp_probe::probe::{self, ProbeReport, ProbeTargets, StepOutcome};
use utcp_probe::tools;
use utcp_probe::utcp::{ManifestClient, ToolInvoker, ToolManifest};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "utcp-probe")]
#[command(version)]
#[command(about = "Tiered UTCP tool discovery with Cognito auth and Bedrock tool calling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables override it).
    #[arg(long, env = "UTCP_PROBE_CONFIG")]
    config: Option<String>,

    /// Log level (debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch the tool manifest and list its tools.
    Discover {
        /// Sign in first and present the token.
        #[arg(long)]
        auth: bool,
    },

    /// Print the manifest translated to Bedrock tool specs.
    Tools {
        #[arg(long)]
        auth: bool,
    },

    /// Invoke a tool from the manifest.
    Invoke {
        /// Tool name.
        name: String,

        /// Input arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        input: String,

        /// Sign in, discover with the token and pass it to the tool.
        #[arg(long)]
        auth: bool,
    },

    /// Run the tiered discovery scenario.
    Probe {
        /// Exit with status 1 when any step fails.
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Offer the tools to Claude on Bedrock and run its tool calls.
    Converse {
        /// Opening user message (defaults to asking for the protected endpoint).
        #[arg(long)]
        prompt: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cfg = config::load(cli.config.as_deref())?;
    cfg.require_discovery()?;

    match cli.command {
        Commands::Discover { auth } => cmd_discover(&cfg, auth).await,
        Commands::Tools { auth } => cmd_tools(&cfg, auth).await,
        Commands::Invoke { name, input, auth } => cmd_invoke(&cfg, &name, &input, auth).await,
        Commands::Probe { strict, json } => cmd_probe(&cfg, strict, json).await,
        Commands::Converse { prompt } => cmd_converse(&cfg, prompt.as_deref()).await,
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_discover(cfg: &ProbeConfig, auth: bool) -> Result<()> {
    let (manifest, _token) = fetch_manifest(cfg, auth).await?;

    println!(
        "{} Discovered {} tools ({}):",
        ">>>".green().bold(),
        manifest.len(),
        if auth { "authenticated" } else { "unauthenticated" }
    );
    for tool in &manifest.tools {
        let lock = if tool.tool_provider.requires_auth() {
            " [auth]".yellow().to_string()
        } else {
            String::new()
        };
        println!("   - {}{}: {}", tool.name.bold(), lock, tool.description);
        println!("     Tags: {}", tool.tags.join(", ").dimmed());
    }
    Ok(())
}

async fn cmd_tools(cfg: &ProbeConfig, auth: bool) -> Result<()> {
    let (manifest, _token) = fetch_manifest(cfg, auth).await?;
    let defs = tools::translate(&manifest);
    let rendered = serde_json::to_string_pretty(&bedrock::tool_config(&defs))
        .context("Failed to render tool specs")?;
    println!("{}", rendered);
    Ok(())
}

async fn cmd_invoke(cfg: &ProbeConfig, name: &str, input: &str, auth: bool) -> Result<()> {
    let inputs: serde_json::Value =
        serde_json::from_str(input).context("--input must be a JSON value")?;
    let (manifest, token) = fetch_manifest(cfg, auth).await?;

    let invoker = ToolInvoker::with_http(config::http_client(cfg)?);
    let invocation = invoker
        .invoke(&manifest, name, &inputs, token.as_deref())
        .await?;

    let status = if invocation.is_success() {
        invocation.status.to_string().green()
    } else {
        invocation.status.to_string().red()
    };
    println!("{} {} -> {}", ">>>".green().bold(), name, status);
    println!("{}", invocation.display_body());
    Ok(())
}

async fn cmd_probe(cfg: &ProbeConfig, strict: bool, json: bool) -> Result<()> {
    // Missing Cognito settings surface as a failed sign-in step.
    let http = config::http_client(cfg)?;
    let manifests = ManifestClient::with_http(&cfg.api_url, http.clone());
    let cognito = CognitoAuth::from_config(cfg, http.clone());
    let invoker = ToolInvoker::with_http(http);
    let targets = ProbeTargets::from_config(cfg);

    if !json {
        println!("{}", "Testing tiered discovery with UTCP".bold());
        println!("{}", "=".repeat(50));
    }

    let report = probe::run_probe(&targets, &manifests, &cognito, &invoker).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to render report")?
        );
    } else {
        print_report(&report);
    }

    if strict && !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_converse(cfg: &ProbeConfig, prompt: Option<&str>) -> Result<()> {
    cfg.require_cognito()?;
    cfg.require_bedrock()?;
    let http = config::http_client(cfg)?;
    let manifests = ManifestClient::with_http(&cfg.api_url, http.clone());
    let cognito = CognitoAuth::from_config(cfg, http.clone());
    let invoker = ToolInvoker::with_http(http.clone());
    let model = ConverseClient::from_config(cfg, http).await?;

    println!(
        "{} Starting conversation (model: {})",
        ">>>".green().bold(),
        cfg.model_id
    );

    let outcome =
        agent::run_conversation(cfg, &cognito, &manifests, &invoker, &model, prompt).await?;

    println!("  Tools offered: {}", outcome.tools_offered);
    for (call, result) in outcome.tool_calls.iter().zip(&outcome.tool_results) {
        let marker = if result.success { "ok".green() } else { "error".red() };
        println!("  Tool {} ({}): {}", call.name.bold(), marker, result.output);
    }
    println!();
    println!("{}", "Claude's response:".bold());
    println!(
        "{}",
        outcome.final_text.as_deref().unwrap_or("(no text in response)")
    );
    println!();
    if let Some(reason) = &outcome.stop_reason {
        println!("  Stop reason: {}", reason.dimmed());
    }
    println!(
        "  Tokens: {} in / {} out, ~${:.4}",
        outcome.usage.prompt_tokens, outcome.usage.completion_tokens, outcome.cost_estimate_usd
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch the manifest, signing in first when `auth` is set.
async fn fetch_manifest(cfg: &ProbeConfig, auth: bool) -> Result<(ToolManifest, Option<String>)> {
    let http = config::http_client(cfg)?;
    let token = if auth {
        cfg.require_cognito()?;
        let cognito = CognitoAuth::from_config(cfg, http.clone());
        Some(
            cognito
                .access_token()
                .await
                .context("Failed to get access token")?,
        )
    } else {
        None
    };

    let manifests = ManifestClient::with_http(&cfg.api_url, http);
    let manifest = manifests
        .fetch(token.as_deref())
        .await
        .context("Failed to discover tools")?;
    Ok((manifest, token))
}

fn print_report(report: &ProbeReport) {
    for step in &report.steps {
        let (marker, note) = match &step.outcome {
            StepOutcome::Passed => ("PASS".green().bold(), String::new()),
            StepOutcome::Failed(reason) => ("FAIL".red().bold(), format!(" ({})", reason)),
            StepOutcome::Skipped(reason) => ("SKIP".yellow().bold(), format!(" ({})", reason)),
        };
        println!(
            "  [{}] {} - {}{}",
            marker,
            step.name,
            step.expectation.to_string().dimmed(),
            note
        );
        if let Some(detail) = &step.detail {
            println!("         {}", detail.dimmed());
        }
    }

    if let Some(cmp) = &report.comparison {
        println!();
        println!("{}", "Discovery comparison:".bold());
        println!("   Unauthenticated: {} tools", cmp.unauthenticated_count);
        println!("   Authenticated:   {} tools", cmp.authenticated_count);
        println!("   Additional tools with auth: {}", cmp.additional);
        if !cmp.hidden_tools.is_empty() {
            println!("   Hidden from anonymous callers: {}", cmp.hidden_tools.join(", "));
        }
    }

    println!();
    if let Some(reason) = &report.aborted {
        println!("{} Probe aborted: {}", "<<<".red().bold(), reason);
    } else if report.is_success() {
        println!("{} Tiered discovery behaves as expected", ">>>".green().bold());
    } else {
        println!(
            "{} {} step(s) failed",
            "<<<".red().bold(),
            report.failed_count()
        );
    }
}
