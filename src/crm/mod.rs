//! Salesforce access: session establishment and record writes.
//!
//! The dispatch logic only sees [`CrmSession`]; the REST implementation lives
//! in [`rest`] and login handling in [`connect`] and [`soap`].
use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

pub mod connect;
pub mod rest;
pub mod soap;

pub use connect::connect;
pub use rest::RestSession;

/// Custom object holding one metadata diff run.
pub const METADATA_DIFF_OBJECT: &str = "PackageManager__Metadata_Differential__c";
pub const STATUS_FIELD: &str = "PackageManager__Metadata_Status__c";
pub const DIFF_FILE_LINK_FIELD: &str = "PackageManager__Diff_File_Link__c";
pub const ATTACHMENT_OBJECT: &str = "Attachment";

/// Outcome of a single CRM write.
///
/// Transport failures are `Err`; a request the CRM answered but refused is an
/// `Ok` response with `success == false` and the CRM's message in `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrmResponse {
    pub success: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CrmResponse {
    pub fn accepted(status: u16, id: Option<String>) -> Self {
        Self {
            success: true,
            status,
            id,
            detail: None,
        }
    }

    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            id: None,
            detail: Some(detail.into()),
        }
    }
}

/// Attachment record to create under a parent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAttachment {
    #[serde(rename = "ParentId")]
    pub parent_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Base64 of the file content.
    #[serde(rename = "Body")]
    pub body: String,
}

/// An authenticated CRM session scoped to one instance.
pub trait CrmSession {
    /// Base URL of the org, e.g. `https://acme.my.salesforce.com`.
    fn instance_url(&self) -> &str;

    fn create_attachment(&self, attachment: &NewAttachment) -> Result<CrmResponse>;

    fn update_record(
        &self,
        object_type: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<CrmResponse>;
}

impl<T: CrmSession + ?Sized> CrmSession for &T {
    fn instance_url(&self) -> &str {
        (**self).instance_url()
    }

    fn create_attachment(&self, attachment: &NewAttachment) -> Result<CrmResponse> {
        (**self).create_attachment(attachment)
    }

    fn update_record(
        &self,
        object_type: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<CrmResponse> {
        (**self).update_record(object_type, record_id, fields)
    }
}

/// Lightning URL of a record's combined attachments list.
pub fn attachments_view_url(instance_url: &str, object_type: &str, record_id: &str) -> String {
    format!(
        "{}/lightning/r/{object_type}/{record_id}/related/CombinedAttachments/view",
        instance_url.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_view_url_matches_lightning_layout() {
        assert_eq!(
            attachments_view_url("https://acme.my.salesforce.com/", METADATA_DIFF_OBJECT, "a001"),
            "https://acme.my.salesforce.com/lightning/r/PackageManager__Metadata_Differential__c/a001/related/CombinedAttachments/view"
        );
    }

    #[test]
    fn attachment_serializes_with_crm_field_names() {
        let attachment = NewAttachment {
            parent_id: "a001".to_string(),
            name: "report.xlsx".to_string(),
            body: "aGk=".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&attachment).unwrap(),
            serde_json::json!({"ParentId": "a001", "Name": "report.xlsx", "Body": "aGk="})
        );
    }
}
