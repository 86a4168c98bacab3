//! In-memory compliance backend
//!
//! Serves the same endpoints as the real document-compliance service with
//! rules held in memory. Used by the client and console test suites, and as
//! a local stand-in via the `compliance-mock` binary.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use compliance_mock::{spawn, MockBackend};
//!
//! let backend = spawn(MockBackend::new().with_document("policy.pdf")).await?;
//! println!("listening on {}", backend.base_url);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::ops::Deref;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::task::JoinHandle;
use tracing::info;

pub use error::MockError;
pub use state::{DocumentsShape, FailureMode, MockBackend, RecordedRequest, RulesShape};

/// Router for every backend endpoint
pub fn router(backend: MockBackend) -> Router {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/documents", get(handlers::list_documents))
        .route("/documents/:id", delete(handlers::delete_document))
        .route("/upload", post(handlers::upload))
        .route("/status/:upload_id", get(handlers::upload_status))
        .route("/fetch_rules/:id", post(handlers::extract_rules))
        .route(
            "/rules",
            get(handlers::get_rules)
                .post(handlers::add_rule)
                .delete(handlers::delete_rule),
        )
        .route("/rag/:id", post(handlers::run_query))
        .route("/test-rag", post(handlers::search))
        .route("/reset_index", post(handlers::reset_index))
        .layer(middleware::from_fn_with_state(
            backend.clone(),
            handlers::record_request,
        ))
        .with_state(backend)
}

/// A backend serving on a local port; stops when dropped
pub struct RunningBackend {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    pub addr: SocketAddr,
    backend: MockBackend,
    server: JoinHandle<()>,
}

impl Deref for RunningBackend {
    type Target = MockBackend;

    fn deref(&self) -> &MockBackend {
        &self.backend
    }
}

impl Drop for RunningBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Serve `backend` on an ephemeral port of 127.0.0.1
pub async fn spawn(backend: MockBackend) -> anyhow::Result<RunningBackend> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(backend.clone());

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Mock backend stopped: {}", e);
        }
    });
    info!("Mock backend listening on {}", addr);

    Ok(RunningBackend {
        base_url: format!("http://{}", addr),
        addr,
        backend,
        server,
    })
}
