//! AWS Lambda entry points.
//!
//! The relay core is blocking, so each invocation runs on the blocking pool
//! while the AWS clients stay bound to the runtime that created them.
use crate::event::{RelayResponse, StatusEvent};
use crate::handler;
use crate::logging::{self, LogFormat};
use crate::storage::S3ObjectStore;
use crate::trigger::{SfnOrchestrator, TriggerResponse};
use crate::Function;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tokio::runtime::Handle;

/// Serve `function` until the runtime shuts the process down.
pub async fn run(function: Function) -> Result<(), Error> {
    logging::init(LogFormat::Json);
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    tracing::info!(function = function.name(), "lambda starting");

    match function {
        Function::StatusRelay => {
            let store = S3ObjectStore::new(aws_sdk_s3::Client::new(&sdk_config), Handle::current());
            lambda_runtime::run(service_fn(move |event| {
                let store = store.clone();
                async move { status_relay(event, store).await }
            }))
            .await
        }
        Function::Trigger => {
            let orchestrator =
                SfnOrchestrator::new(aws_sdk_sfn::Client::new(&sdk_config), Handle::current());
            lambda_runtime::run(service_fn(move |event| {
                let orchestrator = orchestrator.clone();
                async move { trigger(event, orchestrator).await }
            }))
            .await
        }
    }
}

async fn status_relay(
    event: LambdaEvent<StatusEvent>,
    store: S3ObjectStore,
) -> Result<RelayResponse, Error> {
    let (payload, context) = event.into_parts();
    tracing::info!(request_id = %context.request_id, "status relay invoked");
    tokio::task::spawn_blocking(move || handler::status_relay(payload, &store))
        .await?
        .map_err(invocation_error)
}

async fn trigger(
    event: LambdaEvent<Value>,
    orchestrator: SfnOrchestrator,
) -> Result<TriggerResponse, Error> {
    let (payload, context) = event.into_parts();
    tracing::info!(request_id = %context.request_id, "trigger invoked");
    let response =
        tokio::task::spawn_blocking(move || handler::trigger(&payload, || Ok(orchestrator)))
            .await?;
    Ok(response)
}

/// Carry the whole context chain so the caller sees the root cause.
fn invocation_error(err: anyhow::Error) -> Error {
    Error::from(format!("{err:#}"))
}
