pub mod backends;
pub mod template;

pub use template::{PublicAccess, StorageBackend};
