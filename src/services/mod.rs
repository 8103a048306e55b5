// Service exports
pub mod remote;
pub mod sessions;

pub use remote::{ApiClient, ApiError, ApiPaths, ContactStore, DeleteEncoding, GroupStore};
pub use sessions::{SessionRegistry, SharedSession};
