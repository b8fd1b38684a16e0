//! Starts the metadata diff state machine with the incoming event as input.
//!
//! This is the outermost entry point, so failures are reported in the
//! response body instead of being raised.
use anyhow::{anyhow, Context, Result};
use aws_sdk_sfn::error::DisplayErrorContext;
use aws_sdk_sfn::primitives::DateTimeFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;

pub const MISSING_TARGET_ERROR: &str = "Configuration error, Metaman State Machine ARN not found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStarted {
    pub execution_arn: String,
    /// RFC 3339 start time reported by the orchestrator.
    pub start_date: String,
}

/// Starts executions of a workflow identified by an ARN.
pub trait Orchestrator {
    fn start_execution(&self, target: &str, input: &str) -> Result<ExecutionStarted>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggerResponse {
    Started {
        #[serde(rename = "executionArn")]
        execution_arn: String,
        #[serde(rename = "startDate")]
        start_date: String,
    },
    Error {
        error: String,
    },
}

impl TriggerResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, TriggerResponse::Error { .. })
    }
}

/// Forward `event` verbatim to the configured state machine.
///
/// `orchestrator` is only built once a target is known, so a missing target
/// never contacts the orchestrator.
pub fn handle_trigger_event<O, F>(
    event: &Value,
    target: Option<&str>,
    orchestrator: F,
) -> TriggerResponse
where
    O: Orchestrator,
    F: FnOnce() -> Result<O>,
{
    let Some(target) = target else {
        tracing::error!(
            variable = crate::config::STATE_MACHINE_ARN_VAR,
            "state machine target not configured"
        );
        return TriggerResponse::Error {
            error: MISSING_TARGET_ERROR.to_string(),
        };
    };

    match start(event, target, orchestrator) {
        Ok(started) => {
            tracing::info!(
                execution_arn = %started.execution_arn,
                start_date = %started.start_date,
                "state machine started"
            );
            TriggerResponse::Started {
                execution_arn: started.execution_arn,
                start_date: started.start_date,
            }
        }
        Err(err) => {
            tracing::error!(
                state_machine = target,
                error = %format!("{err:#}"),
                "state machine execution failed to start"
            );
            TriggerResponse::Error {
                error: format!("{err:#}"),
            }
        }
    }
}

fn start<O, F>(event: &Value, target: &str, orchestrator: F) -> Result<ExecutionStarted>
where
    O: Orchestrator,
    F: FnOnce() -> Result<O>,
{
    let payload = serde_json::to_string(event).context("serialize trigger payload")?;
    tracing::info!(
        state_machine = target,
        payload_bytes = payload.len(),
        "starting state machine"
    );
    tracing::debug!(payload = %payload, "state machine input");
    orchestrator()?.start_execution(target, &payload)
}

/// Step Functions client for use from blocking code.
#[derive(Clone)]
pub struct SfnOrchestrator {
    client: aws_sdk_sfn::Client,
    runtime: Handle,
}

impl SfnOrchestrator {
    pub fn new(client: aws_sdk_sfn::Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }
}

impl Orchestrator for SfnOrchestrator {
    fn start_execution(&self, target: &str, input: &str) -> Result<ExecutionStarted> {
        let output = self
            .runtime
            .block_on(
                self.client
                    .start_execution()
                    .state_machine_arn(target)
                    .input(input)
                    .send(),
            )
            .map_err(|err| anyhow!("{}", DisplayErrorContext(&err)))
            .context("start state machine execution")?;

        let execution_arn = output.execution_arn();
        if execution_arn.is_empty() {
            return Err(anyhow!("Execution ARN not found for {target}"));
        }
        let start_date = output
            .start_date()
            .fmt(DateTimeFormat::DateTime)
            .context("format execution start date")?;
        Ok(ExecutionStarted {
            execution_arn: execution_arn.to_string(),
            start_date,
        })
    }
}
