//! object-storage - A uniform object-storage abstraction with swappable backends
//!
//! This crate exposes a single storage contract, [`store::ObjectStorage`], with
//! three interchangeable backends:
//! - Local filesystem (objects are plain files under a root directory)
//! - MinIO (S3-compatible, addressed by endpoint URL, path-style requests)
//! - AWS S3 (addressed by region, virtual-hosted URLs)
//!
//! Callers depend only on the trait; the concrete backend is selected from
//! configuration at startup via [`store::from_config`]. Every operation is a
//! thin delegation to the filesystem or to the S3 client -- durability,
//! consistency, retries, and multipart uploads are the wrapped SDK's problem,
//! not this crate's.

pub mod config;
pub mod store;

pub use config::{Backend, ConfigError, StorageConfig};
pub use store::{from_config, FsStore, MinioStore, ObjectStorage, S3Store, StorageError};
