//! Common library for the Shelfmark bookmark directory
//!
//! This crate provides the infrastructure shared by the Shelfmark services:
//! redis key-value access for the single-document store and the storage
//! error types used across the workspace.

pub mod error;
pub mod kv;
