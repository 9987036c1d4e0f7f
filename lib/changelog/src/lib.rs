//! Resolves which tags a changelog is missing and attributes closed issues and merged changes
//! to the release that first shipped them.

pub mod attribution;
pub mod changelog;
pub mod document;
pub mod errors;
pub mod groups;
pub mod release;
pub mod revisions;
pub mod settings;
pub mod tags;

pub use crate::changelog::Changelog;
