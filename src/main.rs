use anyhow::{anyhow, Context, Result};
use clap::Parser;
use metaman_relay::cli::{Command, DiffFileNameArgs, InvokeArgs, RootArgs};
use metaman_relay::logging::{self, LogFormat};
use metaman_relay::storage::S3ObjectStore;
use metaman_relay::trigger::SfnOrchestrator;
use metaman_relay::{handler, lambda, naming, Function, StatusEvent};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    match args.command {
        Command::Lambda(args) => run_lambda(args.function),
        Command::Invoke(args) => {
            logging::init(LogFormat::Text);
            run_invoke(&args)
        }
        Command::DiffFileName(args) => {
            print_diff_file_name(&args);
            Ok(())
        }
    }
}

fn run_lambda(function: Function) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    runtime
        .block_on(lambda::run(function))
        .map_err(|err| anyhow!("lambda runtime for {}: {err}", function.name()))
}

fn run_invoke(args: &InvokeArgs) -> Result<()> {
    let event = read_event(&args.event)?;
    // The relay core blocks; this thread is outside the runtime, so the AWS
    // adapters can drive their futures through the handle.
    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    let handle = runtime.handle().clone();

    let output = match args.function {
        Function::StatusRelay => {
            let event: StatusEvent =
                serde_json::from_value(event).context("parse status relay event")?;
            let store = S3ObjectStore::lazy(handle);
            let response = handler::status_relay(event, &store)?;
            serde_json::to_value(response).context("serialize status relay response")?
        }
        Function::Trigger => {
            let response = handler::trigger(&event, || {
                let config = handle
                    .block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
                Ok(SfnOrchestrator::new(
                    aws_sdk_sfn::Client::new(&config),
                    handle.clone(),
                ))
            });
            serde_json::to_value(response).context("serialize trigger response")?
        }
    };

    let text = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("render invocation result")?;
    println!("{text}");
    Ok(())
}

fn read_event(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read event from stdin")?;
        text
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    serde_json::from_str(&text).context("parse event JSON")
}

fn print_diff_file_name(args: &DiffFileNameArgs) {
    println!(
        "{}",
        naming::diff_file_name(
            &args.old_release,
            &args.new_release,
            &args.diff_type,
            chrono::Utc::now(),
        )
    );
}
