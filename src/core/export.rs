use crate::models::{Contact, GroupId};
use crate::services::remote::{ApiError, GroupStore};
use thiserror::Error;

pub const EXPORT_HEADER: [&str; 5] = ["Email", "First Name", "Last Name", "Member Type", "Status"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

/// Render contacts as CSV
///
/// Every field is double-quoted (embedded quotes doubled) so that names
/// with commas survive a re-import.
pub fn export_csv(contacts: &[Contact]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::with_capacity(64 * (contacts.len() + 1)));

    writer.write_record(EXPORT_HEADER)?;
    for contact in contacts {
        writer.write_record([
            contact.email.as_str(),
            contact.first_name.as_str(),
            contact.last_name.as_str(),
            contact.member_type.as_str(),
            contact.status.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}

/// Export a group's authoritative membership
pub async fn export_group(groups: &dyn GroupStore, group_id: &GroupId) -> Result<String, ExportError> {
    let members = groups.group_members(group_id).await?;
    tracing::info!("Exporting {} contacts from group {}", members.len(), group_id);
    export_csv(&members)
}
