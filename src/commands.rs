//! The two phases of a migration run, implemented as methods on [`crate::App`]:
//!
//! - [`migrate`]: list source repositories, clone or update each one locally and
//!   point it at the destination server
//! - [`publish`]: create destination repositories and push branches and tags

mod migrate;
mod publish;
