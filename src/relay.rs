//! Status dispatch and attachment delivery for metadata diff records.
//!
//! A `COMPLETED` transition writes the attachment and the link field before
//! the status field, so anyone reading `COMPLETED` can rely on the file being
//! there. Nothing is rolled back: if the status write fails after the
//! attachment was created, the attachment stays and the error is surfaced.
use crate::crm::{
    attachments_view_url, CrmResponse, CrmSession, NewAttachment, DIFF_FILE_LINK_FIELD,
    METADATA_DIFF_OBJECT, STATUS_FIELD,
};
use crate::error::RelayError;
use crate::event::{ObjectLocation, RecordStatus, RelayResponse, StatusCommand, StatusEvent};
use crate::storage::ObjectStore;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};

pub const IN_PROGRESS_MESSAGE: &str = "Salesforce record updated successfully: IN-PROGRESS.";
pub const COMPLETED_MESSAGE: &str =
    "Salesforce record updated successfully with attachment: COMPLETED.";
pub const FAILED_MESSAGE: &str = "Salesforce record updated successfully: FAILED.";

/// Validate, connect and dispatch one status event.
///
/// The event is validated before `connect` runs, so malformed input never
/// reaches the CRM. Every failure is logged with the record id and status and
/// then returned unchanged for the orchestrator to handle.
pub fn handle_status_event<S, C>(
    event: StatusEvent,
    connect: C,
    store: &dyn ObjectStore,
) -> Result<RelayResponse>
where
    S: CrmSession,
    C: FnOnce() -> Result<S>,
{
    let span = tracing::info_span!(
        "status_relay",
        record_id = event.metadata_diff_id.as_deref().unwrap_or_default(),
        status = event.status_text().unwrap_or_default(),
    );
    let _guard = span.enter();
    tracing::info!(
        has_bucket = event.s3_bucket.is_some(),
        has_key = event.s3_key.is_some(),
        "status event received"
    );

    let result = event
        .into_command()
        .map_err(anyhow::Error::from)
        .and_then(|command| {
            let session = connect().context("connect to Salesforce")?;
            StatusRelay::new(&session, store).execute(&command)
        });

    match &result {
        Ok(response) => tracing::info!(reply = %response.message, "status relay complete"),
        Err(err) => tracing::error!(error = %format!("{err:#}"), "status relay failed"),
    }
    result
}

/// Record writes for one session.
pub struct StatusRelay<'a> {
    crm: &'a dyn CrmSession,
    store: &'a dyn ObjectStore,
}

impl<'a> StatusRelay<'a> {
    pub fn new(crm: &'a dyn CrmSession, store: &'a dyn ObjectStore) -> Self {
        Self { crm, store }
    }

    /// Run the action sequence for a validated command.
    pub fn execute(&self, command: &StatusCommand) -> Result<RelayResponse> {
        let message = match command {
            StatusCommand::InProgress { record_id } => {
                let response = self.update_status(record_id, RecordStatus::InProgress)?;
                ensure_status_written(response)?;
                IN_PROGRESS_MESSAGE
            }
            StatusCommand::Completed { record_id, object } => {
                let link = self.deliver_attachment(object, record_id)?;
                if !link.success {
                    return Err(RelayError::AttachmentRejected {
                        detail: link.detail,
                    }
                    .into());
                }
                let response = self.update_status(record_id, RecordStatus::Completed)?;
                ensure_status_written(response)?;
                COMPLETED_MESSAGE
            }
            StatusCommand::Failed { record_id } => {
                let response = self.update_status(record_id, RecordStatus::Failed)?;
                ensure_status_written(response)?;
                FAILED_MESSAGE
            }
        };
        Ok(RelayResponse {
            message: message.to_string(),
        })
    }

    /// Copy the object onto the record as an attachment and point the link
    /// field at the record's attachments list.
    ///
    /// Returns the link-field update response.
    pub fn deliver_attachment(
        &self,
        object: &ObjectLocation,
        record_id: &str,
    ) -> Result<CrmResponse> {
        let result = self.try_deliver_attachment(object, record_id);
        if let Err(err) = &result {
            tracing::error!(
                record_id,
                bucket = %object.bucket,
                key = %object.key,
                error = %format!("{err:#}"),
                "unable to attach diff file to record"
            );
        }
        result
    }

    fn try_deliver_attachment(
        &self,
        object: &ObjectLocation,
        record_id: &str,
    ) -> Result<CrmResponse> {
        let content = self
            .store
            .get_object(&object.bucket, &object.key)
            .with_context(|| format!("fetch s3://{}/{}", object.bucket, object.key))?;

        let attachment = NewAttachment {
            parent_id: record_id.to_string(),
            name: attachment_name(&object.key).to_string(),
            body: BASE64.encode(&content),
        };
        tracing::info!(
            record_id,
            file_name = %attachment.name,
            content_bytes = content.len(),
            "sending attachment"
        );
        let created = self
            .crm
            .create_attachment(&attachment)
            .with_context(|| format!("create attachment {}", attachment.name))?;
        if !created.success {
            return Err(RelayError::AttachmentRejected {
                detail: created.detail,
            }
            .into());
        }
        tracing::info!(
            record_id,
            attachment_id = created.id.as_deref().unwrap_or_default(),
            "attachment created"
        );

        self.update_diff_file_link(record_id)
    }

    fn update_diff_file_link(&self, record_id: &str) -> Result<CrmResponse> {
        let url = attachments_view_url(self.crm.instance_url(), METADATA_DIFF_OBJECT, record_id);
        let response = self
            .crm
            .update_record(
                METADATA_DIFF_OBJECT,
                record_id,
                &single_field(DIFF_FILE_LINK_FIELD, url),
            )
            .with_context(|| format!("update {DIFF_FILE_LINK_FIELD} on {record_id}"))?;
        tracing::info!(
            record_id,
            success = response.success,
            http_status = response.status,
            "diff file link updated"
        );
        Ok(response)
    }

    /// Write `status` into the record's status field.
    pub fn update_status(&self, record_id: &str, status: RecordStatus) -> Result<CrmResponse> {
        tracing::info!(record_id, to_status = %status, "updating record status");
        let result = self
            .crm
            .update_record(
                METADATA_DIFF_OBJECT,
                record_id,
                &single_field(STATUS_FIELD, status.as_str()),
            )
            .with_context(|| format!("update {STATUS_FIELD} on {record_id}"));
        match &result {
            Ok(response) => tracing::info!(
                record_id,
                success = response.success,
                http_status = response.status,
                "status field updated"
            ),
            Err(err) => tracing::error!(
                record_id,
                to_status = %status,
                error = %format!("{err:#}"),
                "error updating record status"
            ),
        }
        result
    }
}

/// Final path segment of an object key.
pub fn attachment_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn ensure_status_written(response: CrmResponse) -> Result<()> {
    if response.success {
        return Ok(());
    }
    Err(RelayError::StatusRejected {
        detail: response.detail,
    }
    .into())
}

fn single_field(name: &str, value: impl Into<String>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(name.to_string(), Value::String(value.into()));
    fields
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
