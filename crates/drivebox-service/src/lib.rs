//! # drivebox-service
//!
//! Business logic for the Drivebox entry tree. The [`EntryStore`]
//! orchestrates the persistence backend, the path resolver, and the
//! integrity guard to keep the per-owner file/folder hierarchy consistent
//! under every mutation.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references. The acting user is passed
//! explicitly into every operation; no ambient request context is used.

pub mod entry;

pub use entry::{CreateEntryRequest, EntryStore};
