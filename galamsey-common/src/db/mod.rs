//! Database models and queries

pub mod batches;
pub mod init;
pub mod models;
pub mod sites;

pub use init::*;
pub use models::*;
