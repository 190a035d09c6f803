//! Library half of the `mdpipe` binary: catalog loading, CLI overrides and the
//! batch driver, kept here so integration tests can run whole batches.

pub mod catalog;
pub use catalog::{Catalog, CatalogError, Selection};

pub mod cli;
pub use cli::Cli;

mod app;
pub use app::{Plan, execute, list_jobs};
