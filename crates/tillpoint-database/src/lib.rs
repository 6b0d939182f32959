//! # tillpoint-database
//!
//! PostgreSQL database connection management and concrete repository
//! implementations for the Tillpoint permission engine entities.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
