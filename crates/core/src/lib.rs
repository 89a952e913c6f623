//! Core domain types for the propagator service.
//!
//! This crate defines the data model shared by the store and the server:
//! - Normalized record paths and segment-bounded subtree matching
//! - The home-directory layout that bounds propagation
//! - Change fingerprints (etag + mtime)
//! - Caller identities and shared-secret tokens
//! - Configuration

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod path;

pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use identity::Identity;
pub use path::{PathLayout, RecordPath};
