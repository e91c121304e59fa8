//! Entry tree operations.

pub mod guard;
pub mod path;
pub mod store;

pub use store::{CreateEntryRequest, EntryStore};
