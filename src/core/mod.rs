// Core algorithm exports
pub mod diff;
pub mod export;
pub mod importer;
pub mod ingest;
pub mod lifecycle;
pub mod reconcile;
pub mod session;

pub use diff::{compute_diff, sets_differ, sizes_differ, MembershipDiff};
pub use export::{export_csv, export_group, ExportError};
pub use importer::{ImportReport, Importer, DEFAULT_REASON_LIMIT};
pub use ingest::{extract_email, parse_contacts, split_fields, split_full_name, ParseOutput, ParsedContact};
pub use lifecycle::{bulk_delete_contacts, bulk_update_status, delete_contact, delete_group, filter_visible, group_stats, BulkReport};
pub use reconcile::{apply_save, reconcile, SaveError, SaveOutcome};
pub use session::{MembershipSession, SaveTicket, SessionError, SessionState};
