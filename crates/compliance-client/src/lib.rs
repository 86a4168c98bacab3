//! Typed async client for the document-compliance backend
//!
//! The backend exposes a handful of REST endpoints for documents, rules and
//! queries. This crate turns them into typed calls:
//!
//! - [`ComplianceClient`] sends the requests (reqwest)
//! - [`normalize`] reduces the backend's alternative response shapes to one
//! - [`ClientConfig`] holds the backend address
//!
//! Every call fails with the single [`ClientError::RequestFailed`] kind.

pub mod client;
pub mod config;
pub mod error;
pub mod normalize;

pub use client::{ComplianceApi, ComplianceClient, UploadFile};
pub use config::{ClientConfig, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use error::{ClientError, ClientResult, RequestFailure};
