//! Installation metadata for the lake versioning index.
//!
//! Records when and where an installation was set up and keeps runtime
//! values (version, platform, store description) current through a
//! background [`MetadataRefresher`].

pub mod config;
pub mod error;
pub mod metadata;
pub mod refresher;
pub mod service;

pub use config::RefresherConfig;
pub use error::{MetaError, MetaResult};
pub use metadata::{update_metadata_values, write_initial_metadata};
pub use refresher::MetadataRefresher;
pub use service::{KvMetadataService, MetadataService, MetadataSource};
