//! Courier core library: remote descriptors and the on-disk naming layout.
//!
//! - [`descriptor`]: parse the first line of a proxy file into a [`RemoteDescriptor`]
//! - [`layout`]: deterministic snapshot / artifact / baseline file names
//! - [`error`]: [`DescriptorError`]

pub mod descriptor;
pub mod error;
pub mod layout;

pub use descriptor::{MountIdentity, RemoteDescriptor};
pub use error::DescriptorError;
pub use layout::{path_digest, upstream_sibling, TargetLayout};
