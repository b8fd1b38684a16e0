//! Typed failures that callers need to tell apart.
//!
//! Everything else travels as `anyhow::Error` with context attached; these
//! variants ride inside it and can be recovered with `downcast_ref`.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Missing S3 bucket or key information.")]
    MissingObjectLocation,
    #[error("Missing metadata_diff_id in status event.")]
    MissingRecordId,
    #[error("Failed to update metadata diff record with attachment.")]
    AttachmentRejected { detail: Option<String> },
    #[error("Failed to update Salesforce record status.")]
    StatusRejected { detail: Option<String> },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("Salesforce login failed: {0}")]
    Login(String),
}
