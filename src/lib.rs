//! Daily log: closed-task ingestion, persistence and mail digest.

pub mod config;
pub mod connectors;
pub mod dates;
pub mod error;
pub mod http;
pub mod ingest;
pub mod job;
pub mod publish;
