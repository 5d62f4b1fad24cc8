//! Tiered discovery probe.
//!
//! Walks the scenario a tiered UTCP server should satisfy: anonymous callers
//! see only public tools, authenticated callers see everything, public tools
//! answer with or without a credential and protected tools refuse anonymous
//! calls.

pub mod report;

pub use report::{Expectation, ProbeReport, ProbeStep, StepOutcome};

use crate::config::{ProbeConfig, DEFAULT_PROTECTED_TOOL, DEFAULT_PUBLIC_TOOL};
use crate::identity::TokenProvider;
use crate::utcp::{
    AuthHeader, DiscoveryComparison, ManifestClient, ToolInvoker, ToolManifest,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

pub const STEP_DISCOVER_ANON: &str = "discover without auth";
pub const STEP_SIGN_IN: &str = "sign in";
pub const STEP_DISCOVER_AUTH: &str = "discover with auth";
pub const STEP_COMPARE: &str = "compare discovery";
pub const STEP_PUBLIC_ANON: &str = "public tool without auth";
pub const STEP_PUBLIC_AUTH: &str = "public tool with auth";
pub const STEP_PROTECTED_ANON: &str = "protected tool without auth";
pub const STEP_PROTECTED_AUTH: &str = "protected tool with auth";

/// Tool names the probe exercises.
#[derive(Debug, Clone)]
pub struct ProbeTargets {
    pub public_tool: String,
    pub protected_tool: String,
}

impl Default for ProbeTargets {
    fn default() -> Self {
        Self {
            public_tool: DEFAULT_PUBLIC_TOOL.into(),
            protected_tool: DEFAULT_PROTECTED_TOOL.into(),
        }
    }
}

impl ProbeTargets {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            public_tool: config.public_tool.clone(),
            protected_tool: config.protected_tool.clone(),
        }
    }
}

/// Run the tiered discovery scenario.
pub async fn run_probe(
    targets: &ProbeTargets,
    manifests: &ManifestClient,
    tokens: &dyn TokenProvider,
    invoker: &ToolInvoker,
) -> ProbeReport {
    let mut report = ProbeReport::new();

    let anon = discover(&mut report, STEP_DISCOVER_ANON, manifests, None).await;

    let token = match tokens.access_token().await {
        Ok(token) => {
            report.push(STEP_SIGN_IN, Expectation::Accept, StepOutcome::Passed, None);
            token
        }
        Err(e) => {
            error!("Failed to get access token, stopping probe: {}", e);
            report.push(
                STEP_SIGN_IN,
                Expectation::Accept,
                StepOutcome::Failed(e.to_string()),
                None,
            );
            report.aborted = Some(format!("sign-in failed: {}", e));
            report.finished_at = Some(Utc::now());
            return report;
        }
    };

    let full = discover(&mut report, STEP_DISCOVER_AUTH, manifests, Some(&token)).await;

    let comparison = DiscoveryComparison::between(anon.as_ref(), full.as_ref());
    info!(
        "Discovery: {} anonymous, {} authenticated, {} additional with auth",
        comparison.unauthenticated_count, comparison.authenticated_count, comparison.additional
    );
    let compare_outcome = match (&anon, &full) {
        (Some(_), Some(_)) if comparison.is_tiered => StepOutcome::Passed,
        (Some(_), Some(_)) => StepOutcome::Failed(format!(
            "anonymous manifest lists tools missing with auth: {}",
            comparison.leaked_tools.join(", ")
        )),
        _ => StepOutcome::Skipped("a manifest fetch failed".into()),
    };
    report.push(STEP_COMPARE, Expectation::Accept, compare_outcome, None);
    report.comparison = Some(comparison);

    // Public tool: anonymous call uses the anonymous manifest, the
    // authenticated call uses the authenticated one.
    call_step(
        &mut report,
        STEP_PUBLIC_ANON,
        Expectation::Accept,
        invoker,
        anon.as_ref(),
        &targets.public_tool,
        None,
    )
    .await;
    call_step(
        &mut report,
        STEP_PUBLIC_AUTH,
        Expectation::Accept,
        invoker,
        full.as_ref(),
        &targets.public_tool,
        Some(&token),
    )
    .await;

    // Protected tool definition only exists in the authenticated manifest.
    call_step(
        &mut report,
        STEP_PROTECTED_ANON,
        Expectation::Reject,
        invoker,
        full.as_ref(),
        &targets.protected_tool,
        None,
    )
    .await;
    call_step(
        &mut report,
        STEP_PROTECTED_AUTH,
        Expectation::Accept,
        invoker,
        full.as_ref(),
        &targets.protected_tool,
        Some(&token),
    )
    .await;

    report.finished_at = Some(Utc::now());
    report
}

async fn discover(
    report: &mut ProbeReport,
    step: &str,
    manifests: &ManifestClient,
    credential: Option<&str>,
) -> Option<ToolManifest> {
    match manifests.fetch(credential).await {
        Ok(manifest) => {
            let names = manifest.names().join(", ");
            report.push(
                step,
                Expectation::Accept,
                StepOutcome::Passed,
                Some(format!("{} tools: {}", manifest.len(), names)),
            );
            Some(manifest)
        }
        Err(e) => {
            warn!("Failed to discover tools ({}): {}", step, e);
            report.push(
                step,
                Expectation::Accept,
                StepOutcome::Failed(e.to_string()),
                None,
            );
            None
        }
    }
}

async fn call_step(
    report: &mut ProbeReport,
    step: &str,
    expectation: Expectation,
    invoker: &ToolInvoker,
    manifest: Option<&ToolManifest>,
    tool: &str,
    credential: Option<&str>,
) {
    let Some(manifest) = manifest else {
        report.push(
            step,
            expectation,
            StepOutcome::Skipped("manifest unavailable".into()),
            None,
        );
        return;
    };
    let Some(descriptor) = manifest.find(tool) else {
        report.push(
            step,
            expectation,
            StepOutcome::Skipped(format!("{} is not in the manifest", tool)),
            None,
        );
        return;
    };

    // Tools that declare no auth block still get the credential as a plain
    // Authorization header when one is offered.
    let auth = credential.map(|value| AuthHeader {
        name: descriptor
            .tool_provider
            .auth_header()
            .unwrap_or("Authorization")
            .to_string(),
        value: value.to_string(),
    });

    match invoker.call(descriptor, &json!({}), auth.as_ref()).await {
        Ok(invocation) => {
            let outcome = match (expectation, invocation.is_success()) {
                (Expectation::Accept, true) | (Expectation::Reject, false) => StepOutcome::Passed,
                (Expectation::Accept, false) => {
                    StepOutcome::Failed(format!("status {}", invocation.status))
                }
                (Expectation::Reject, true) => {
                    StepOutcome::Failed(format!("unexpected success (status {})", invocation.status))
                }
            };
            info!("{}: status {}", step, invocation.status);
            report.push(step, expectation, outcome, Some(invocation.display_body()));
        }
        Err(e) => {
            warn!("{}: {}", step, e);
            report.push(step, expectation, StepOutcome::Failed(e.to_string()), None);
        }
    }
}
