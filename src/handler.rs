//! Invocation handlers shared by the Lambda runtime and the local CLI.
//!
//! Both read their configuration from the process environment on every call;
//! nothing is cached between invocations.
use crate::config::{self, CrmConfig};
use crate::crm;
use crate::event::{RelayResponse, StatusEvent};
use crate::relay;
use crate::storage::ObjectStore;
use crate::trigger::{self, Orchestrator, TriggerResponse};
use anyhow::Result;
use serde_json::Value;

/// Status relay: validate, connect with the configured credentials, dispatch.
pub fn status_relay(event: StatusEvent, store: &dyn ObjectStore) -> Result<RelayResponse> {
    relay::handle_status_event(
        event,
        || {
            let config = CrmConfig::from_env()?;
            crm::connect(&config)
        },
        store,
    )
}

/// Trigger: start the configured state machine with `event` as input.
pub fn trigger<O, F>(event: &Value, orchestrator: F) -> TriggerResponse
where
    O: Orchestrator,
    F: FnOnce() -> Result<O>,
{
    let target = config::state_machine_arn(|name| std::env::var(name).ok());
    trigger::handle_trigger_event(event, target.as_deref(), orchestrator)
}
