//! CLI argument parsing for the relay binary.
use crate::Function;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "metaman-relay",
    version,
    about = "Relay metadata diff status between Step Functions and Salesforce",
    after_help = "Examples:\n  metaman-relay lambda status-relay\n  metaman-relay invoke trigger --event event.json\n  echo '{\"status\":\"IN-PROGRESS\",\"metadata_diff_id\":\"a001\"}' | metaman-relay invoke status-relay --event -\n  metaman-relay diff-file-name --old-release 'Spring 24' --new-release 'Summer 24' --diff-type data-model",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Lambda(LambdaArgs),
    Invoke(InvokeArgs),
    DiffFileName(DiffFileNameArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Serve a function under the AWS Lambda runtime")]
pub struct LambdaArgs {
    #[arg(value_enum)]
    pub function: Function,
}

#[derive(Parser, Debug)]
#[command(about = "Run one invocation locally and print the JSON result")]
pub struct InvokeArgs {
    #[arg(value_enum)]
    pub function: Function,

    /// JSON event file, or `-` for stdin
    #[arg(long, value_name = "PATH")]
    pub event: PathBuf,

    /// Pretty-print the result
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print the canonical spreadsheet name for a diff run")]
pub struct DiffFileNameArgs {
    #[arg(long, value_name = "RELEASE")]
    pub old_release: String,

    #[arg(long, value_name = "RELEASE")]
    pub new_release: String,

    /// Diff type, e.g. data-model or permission-list
    #[arg(long, value_name = "TYPE")]
    pub diff_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_invoke() {
        let args = RootArgs::try_parse_from([
            "metaman-relay",
            "invoke",
            "status-relay",
            "--event",
            "-",
        ])
        .unwrap();
        match args.command {
            Command::Invoke(invoke) => {
                assert_eq!(invoke.function, Function::StatusRelay);
                assert_eq!(invoke.event, PathBuf::from("-"));
                assert!(!invoke.pretty);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn function_names_match_cli_values() {
        for function in [Function::StatusRelay, Function::Trigger] {
            let args =
                RootArgs::try_parse_from(["metaman-relay", "lambda", function.name()]).unwrap();
            match args.command {
                Command::Lambda(lambda) => assert_eq!(lambda.function, function),
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_unknown_function() {
        assert!(RootArgs::try_parse_from(["metaman-relay", "lambda", "reporter"]).is_err());
    }
}
