//! Shelfmark directory service
//!
//! This crate implements the access-control and persistence engine behind
//! the bookmark directory HTTP API: the single-document store, the
//! password/session authentication path, and the authorization model that
//! filters and mutates categories, bookmarks, and users according to role
//! and per-user visibility sets.

pub mod authz;
pub mod error;
pub mod graph;
pub mod models;
pub mod password;
pub mod routes;
pub mod state;
pub mod store;
pub mod token;
pub mod validation;
