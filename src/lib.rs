//! Status relay between the metadata diff state machine and Salesforce.
//!
//! Two stateless functions: [`trigger`] starts a state machine execution with
//! the incoming event, and [`relay`] writes status updates (and, on
//! completion, the generated diff file) onto the Salesforce record.
pub mod cli;
pub mod config;
pub mod crm;
pub mod error;
pub mod event;
pub mod handler;
pub mod lambda;
pub mod logging;
pub mod naming;
pub mod relay;
pub mod storage;
pub mod trigger;

pub use error::RelayError;
pub use event::{RelayResponse, StatusEvent};

/// The deployable functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Function {
    StatusRelay,
    Trigger,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Function::StatusRelay => "status-relay",
            Function::Trigger => "trigger",
        }
    }
}
