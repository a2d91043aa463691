//! topdeps Core - package naming and on-disk layout
//!
//! This crate holds the synchronous, filesystem-only pieces of topdeps:
//! - `PackageName`: plain and scoped registry names
//! - `PackageManifest`: the `package.json` fields needed for placement
//! - `archive`: tarball extraction
//! - `layout`: placement with collision fallback, and scope flattening
//! - `verify`: destination inspection

pub mod archive;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod name;
pub mod verify;

pub use archive::{extract_tarball, package_root};
pub use error::{CoreError, Result};
pub use layout::{
    NormalizeReport, flatten_scoped_packages, is_scope_dir, place_package, suffixed_destination,
};
pub use manifest::{MANIFEST_FILE, PackageManifest};
pub use name::{PackageName, SCOPE_PREFIX, flattened_dir_name};
pub use verify::{DestinationSummary, has_package, missing_packages};
