//! Inputs that sit beside the scanned sources: the JSON permission manifest
//! and the `rpcgen.toml` generator configuration.

pub mod config;
pub mod manifest;
pub mod mask;

// Re-export key types for convenience.
pub use config::Config;
pub use manifest::{Manifest, ManifestError, Permission, Role, BYPASS_INDEX};
pub use mask::PermissionMask;
