//! Invocation payloads for the status relay.
use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const IN_PROGRESS: &str = "IN-PROGRESS";
pub const COMPLETED: &str = "COMPLETED";
pub const FAILED: &str = "FAILED";

/// Status event sent by the orchestrator for one record transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusEvent {
    /// Kept as raw JSON; a non-string status is classified, not rejected.
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub metadata_diff_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
}

/// Target status written to the CRM record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    InProgress,
    Completed,
    Failed,
}

impl RecordStatus {
    /// Anything other than the two known progress values maps to `Failed`.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw {
            Some(IN_PROGRESS) => RecordStatus::InProgress,
            Some(COMPLETED) => RecordStatus::Completed,
            _ => RecordStatus::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::InProgress => IN_PROGRESS,
            RecordStatus::Completed => COMPLETED,
            RecordStatus::Failed => FAILED,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a generated diff file in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// A status event that passed input validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCommand {
    InProgress { record_id: String },
    Completed { record_id: String, object: ObjectLocation },
    Failed { record_id: String },
}

impl StatusCommand {
    pub fn record_id(&self) -> &str {
        match self {
            StatusCommand::InProgress { record_id }
            | StatusCommand::Completed { record_id, .. }
            | StatusCommand::Failed { record_id } => record_id,
        }
    }

    pub fn status(&self) -> RecordStatus {
        match self {
            StatusCommand::InProgress { .. } => RecordStatus::InProgress,
            StatusCommand::Completed { .. } => RecordStatus::Completed,
            StatusCommand::Failed { .. } => RecordStatus::Failed,
        }
    }
}

impl StatusEvent {
    /// The status as text, if it was sent as a JSON string.
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    /// Validate the event and resolve it into the command to execute.
    ///
    /// Runs before any CRM call so a malformed event never touches the record.
    pub fn into_command(self) -> Result<StatusCommand, RelayError> {
        let record_id = non_empty(self.metadata_diff_id).ok_or(RelayError::MissingRecordId)?;
        let command = match RecordStatus::classify(self.status.as_ref().and_then(Value::as_str)) {
            RecordStatus::InProgress => StatusCommand::InProgress { record_id },
            RecordStatus::Completed => {
                let (Some(bucket), Some(key)) = (non_empty(self.s3_bucket), non_empty(self.s3_key))
                else {
                    return Err(RelayError::MissingObjectLocation);
                };
                StatusCommand::Completed {
                    record_id,
                    object: ObjectLocation { bucket, key },
                }
            }
            RecordStatus::Failed => StatusCommand::Failed { record_id },
        };
        Ok(command)
    }
}

/// Successful status relay result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelayResponse {
    pub message: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
