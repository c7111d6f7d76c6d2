//! Core types and trait definitions for the terroir field-operations tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; the policy engine, the SQLite backend and
//! the HTTP layer all speak in these types.

pub mod activity;
pub mod assignment;
pub mod error;
pub mod filter;
pub mod id;
pub mod principal;
pub mod region;
pub mod site;
pub mod store;
pub mod user;

pub use error::{Error, Result};
