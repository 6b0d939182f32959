//! # tillpoint-core
//!
//! Core crate for the Tillpoint point-of-sale platform. Contains the
//! configuration schemas, validated capability key types, pagination types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other Tillpoint crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
