//! Idempotent persistence for block stats and percentiles.
//!
//! The [`Repository`] trait is the storage-backend-agnostic boundary the
//! rest of the crate depends on; [`SqliteRepository`] is the only
//! implementation today.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

/// Storage-backend-agnostic persistence interface.
mod repository;
pub use repository::Repository;

/// Errors returned by [`Repository`] implementations.
mod error;
pub use error::StoreError;

/// The SQLite-backed [`Repository`] implementation.
mod sqlite;
pub use sqlite::SqliteRepository;
