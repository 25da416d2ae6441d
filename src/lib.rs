//! fscatalog - Filesystem tree catalog builder
//!
//! This library walks one or more directory trees and records their structure
//! (directories, files, symlinks) in a SQLite database, so the same dataset
//! can later be compared across different storage locations.

pub mod error;
pub mod hierarchy;
pub mod ingest;
pub mod models;
pub mod resolve;
pub mod resume;
pub mod store;
pub mod walk;

pub use error::Error;
pub use hierarchy::{build_hierarchy, resume_hierarchy};
pub use ingest::ingest_files;
pub use models::{Directory, File, FileSystem, NewFile};
pub use resolve::PathResolver;
pub use resume::{ScanConfig, run_scan};
pub use store::{CatalogStats, CatalogStore};
pub use walk::{DirListing, Walk};
