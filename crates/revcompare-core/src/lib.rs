//! Compares two revisions across (possibly different) hg or git repositories.
//!
//! A comparison resolves both references, computes the changesets that
//! separate them (merge preview or raw range), and produces a size-bounded,
//! per-file diff. Repositories are only read; the git backend fetches objects
//! between the two stores when they differ.

pub mod config;
mod error;
pub mod models;
mod repository;
pub mod services;

pub use config::CompareConfig;
pub use error::{Error, Result};
pub use repository::Repository;
pub use revcompare_types::{BackendKind, RefKind, Reference, RevisionId};
