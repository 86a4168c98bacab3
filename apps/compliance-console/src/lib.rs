//! Compliance Console - view-model for document rule review
//!
//! Drives the document list, the selected document's rules and free-text
//! queries against a [`compliance_client::ComplianceApi`]. Rendering is left
//! to the embedding UI, which reads [`ConsoleState`] snapshots.

pub mod console;
pub mod error;
pub mod logging;
pub mod notify;
pub mod state;

pub use console::{ComplianceConsole, ConsoleView};
pub use error::{ConsoleError, ValidationError};
pub use notify::{Notifier, TracingNotifier};
pub use state::{ConsoleState, Region, RequestToken};
