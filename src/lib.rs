//! Shelby Uploader Library
//!
//! Registers a content-addressed blob on the ledger, then pushes its bytes
//! to the Shelby storage endpoint, and reconciles both into one upload.
//!
//! # Modules
//!
//! - `fingerprint`: SHA-256 content fingerprint and chunkset planning
//! - `registration`: "register blob" transaction payload
//! - `submitter`: injected transaction signer/submitter boundary
//! - `transfer`: blob `PUT` with bounded fixed-delay retry
//! - `orchestrator`: sequences one upload attempt end to end
//! - `retrieval`: `HEAD` probe that test-reads a stored blob
//! - `history`: local record of past uploads (SQLite or in-memory)

pub mod config;
pub mod display;
pub mod error;
pub mod fingerprint;
pub mod history;
pub mod orchestrator;
pub mod registration;
pub mod retrieval;
pub mod submitter;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{FailureKind, Result, UploadError};
pub use orchestrator::{UploadOrchestrator, UploadReport, UploadState};
pub use types::{UploadRequest, UploadResult};
