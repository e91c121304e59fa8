//! # drivebox-database
//!
//! Persistence backends for the Drivebox entry tree: the
//! [`EntryRepository`] seam, a PostgreSQL implementation, an in-memory
//! arena implementation, connection-pool management, and the migration
//! runner.

pub mod connection;
pub mod migration;
pub mod repository;

pub use connection::DatabasePool;
pub use repository::memory::MemoryEntryRepository;
pub use repository::postgres::PgEntryRepository;
pub use repository::EntryRepository;
