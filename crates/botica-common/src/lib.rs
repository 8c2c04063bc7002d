//! # botica-common
//!
//! Shared configuration and error types used across the Botica crates.
//! No database access lives here, only the connection parameters and the
//! rules for reading them from the environment.

pub mod config;
pub mod error;
