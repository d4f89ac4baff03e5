//! In-memory collaborators for dry runs and tests.

mod source;
mod store;

pub use source::InMemorySource;
pub use store::{InMemoryStore, StoreEvent};
