//! External system adapters.
//!
//! - [`source`] - the [`SourceReader`](source::SourceReader) contract and reader factory
//! - [`postgresql`] - remote HR database (federated reads and bulk import)
//! - [`filesystem`] - JSON directory source, local raw store and snapshot files

pub mod filesystem;
pub mod postgresql;
pub mod source;
