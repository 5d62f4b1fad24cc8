//! Probe report types.

use crate::utcp::DiscoveryComparison;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// What a step expects from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// The call should succeed (2xx / manifest returned).
    Accept,
    /// The call should be refused (non-2xx).
    Reject,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "should succeed"),
            Self::Reject => write!(f, "should be rejected"),
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One step of the probe scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeStep {
    pub name: String,
    pub expectation: Expectation,
    pub outcome: StepOutcome,
    /// Response body or error text, for display.
    pub detail: Option<String>,
}

/// Full probe run.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<ProbeStep>,
    pub comparison: Option<DiscoveryComparison>,
    /// Set when the run stopped early (sign-in failure).
    pub aborted: Option<String>,
}

impl ProbeReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            comparison: None,
            aborted: None,
        }
    }

    pub fn push(
        &mut self,
        name: &str,
        expectation: Expectation,
        outcome: StepOutcome,
        detail: Option<String>,
    ) {
        self.steps.push(ProbeStep {
            name: name.to_string(),
            expectation,
            outcome,
            detail,
        });
    }

    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_failed()).count()
    }

    /// No step failed and the run was not aborted.
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.failed_count() == 0
    }

    pub fn step(&self, name: &str) -> Option<&ProbeStep> {
        self.steps.iter().find(|s| s.name == name)
    }
}

impl Default for ProbeReport {
    fn default() -> Self {
        Self::new()
    }
}
