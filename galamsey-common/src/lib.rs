//! # Galamsey Common Library
//!
//! Shared code for the Galamsey data store service:
//! - Database initialization, models and queries
//! - CSV parsing and the ingestion pipeline
//! - Aggregate statistics over site records
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod stats;

pub use error::{Error, Result};
