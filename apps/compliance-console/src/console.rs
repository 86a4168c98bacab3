//! Console operations
//!
//! Each operation validates its input, sends at most a few requests through
//! the [`ComplianceApi`] and folds the answers into [`ConsoleState`] via
//! reducer actions. Operations take `&self` and may run concurrently.

use std::future::Future;
use std::sync::Arc;

use compliance_client::{ClientError, ComplianceApi, UploadFile};
use shared_types::{DocumentId, QueryResult, RuleType, UploadReceipt};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{error, info, warn};

use crate::error::{ConsoleError, ConsoleResult, ValidationError};
use crate::notify::{Notifier, TracingNotifier};
use crate::state::{Action, Applied, ConsoleState, Region, RequestToken};

pub const UPLOAD_SUCCESS: &str = "File uploaded successfully";
pub const EXTRACTION_SUCCESS: &str = "Rules extracted and saved";

pub struct ComplianceConsole<A, N = TracingNotifier> {
    api: A,
    notifier: N,
    state: Arc<RwLock<ConsoleState>>,
}

impl<A: ComplianceApi> ComplianceConsole<A, TracingNotifier> {
    /// Console that reports notices to the log
    pub fn new(api: A) -> Self {
        Self::with_notifier(api, TracingNotifier)
    }
}

impl<A: ComplianceApi, N: Notifier> ComplianceConsole<A, N> {
    pub fn with_notifier(api: A, notifier: N) -> Self {
        Self {
            api,
            notifier,
            state: Arc::new(RwLock::new(ConsoleState::new())),
        }
    }

    /// Read-only handle for a UI that renders from the state
    pub fn view(&self) -> ConsoleView {
        ConsoleView {
            state: Arc::clone(&self.state),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> ConsoleState {
        self.state.read().await.clone()
    }

    /// Load the document list
    pub async fn mount(&self) -> ConsoleResult<()> {
        match self
            .tracked(Region::Documents, self.api.list_documents())
            .await
        {
            Ok(documents) => {
                info!("Loaded {} documents", documents.len());
                self.apply(Action::DocumentsLoaded(documents)).await;
                Ok(())
            }
            Err(e) => Err(self.fail("load documents", e).await),
        }
    }

    /// Change the selection and load its rules; `None` deselects
    pub async fn select_document(&self, document: Option<DocumentId>) -> ConsoleResult<()> {
        let token = {
            let mut state = self.state.write().await;
            state.apply(Action::Select(document));
            state.token()
        };
        match token {
            Some(token) => self.refresh_rules(token).await,
            None => Ok(()),
        }
    }

    /// Upload a file and reload the list
    ///
    /// The selection and its rules are left alone. A failed reload is
    /// reported through the state and the notifier; the upload itself still
    /// succeeded, so its receipt is returned.
    pub async fn upload(&self, file: Option<&UploadFile>) -> ConsoleResult<UploadReceipt> {
        let Some(file) = file else {
            return Err(self.reject(ValidationError::MissingFile).await);
        };

        let receipt = match self
            .tracked(Region::Upload, self.api.upload_document(file))
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.fail("upload file", e).await),
        };
        info!("Uploaded {}", file.file_name);
        self.notifier.success(UPLOAD_SUCCESS);

        if let Err(e) = self.mount().await {
            warn!("Uploaded {} but the list was not reloaded: {}", file.file_name, e);
        }
        Ok(receipt)
    }

    /// Have the backend extract rules from the selected document, then reload them
    pub async fn extract_rules(&self) -> ConsoleResult<()> {
        let token = self.require_selection().await?;

        if let Err(e) = self
            .tracked(Region::Extraction, self.api.extract_rules(&token.document))
            .await
        {
            return Err(self.fail("extract rules", e).await);
        }
        info!("Extracted rules for {}", token.document);
        self.notifier.success(EXTRACTION_SUCCESS);

        self.refresh_rules(token).await
    }

    pub async fn add_rule(&self, rule_type: RuleType, value: &str) -> ConsoleResult<()> {
        let token = self.require_selection().await?;
        let value = value.trim();
        if value.is_empty() {
            return Err(self.reject(ValidationError::EmptyRuleValue).await);
        }

        if let Err(e) = self
            .tracked(
                Region::RuleEdit,
                self.api.add_rule(&token.document, rule_type, value),
            )
            .await
        {
            return Err(self.fail("add rule", e).await);
        }
        info!("Added {} rule to {}", rule_type, token.document);

        self.refresh_rules(token).await
    }

    pub async fn delete_rule(&self, rule_type: RuleType, value: &str) -> ConsoleResult<()> {
        let token = self.require_selection().await?;

        if let Err(e) = self
            .tracked(
                Region::RuleEdit,
                self.api.delete_rule(&token.document, rule_type, value),
            )
            .await
        {
            return Err(self.fail("delete rule", e).await);
        }
        info!("Deleted {} rule from {}", rule_type, token.document);

        self.refresh_rules(token).await
    }

    /// Ask a free-text question about the selected document
    ///
    /// A failed query keeps the previous result.
    pub async fn run_query(&self, text: &str) -> ConsoleResult<QueryResult> {
        let token = self.require_selection().await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject(ValidationError::EmptyQuery).await);
        }

        let result = match self
            .tracked(Region::Query, self.api.run_query(&token.document, text))
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.fail("run query", e).await),
        };

        let applied = self
            .apply(Action::QueryAnswered {
                document: token.document.clone(),
                result: result.clone(),
            })
            .await;
        if applied == Applied::Discarded {
            warn!("Discarded query answer for {}", token.document);
        }
        Ok(result)
    }

    /// Delete a document; deselects it when selected and reloads the list
    pub async fn delete_document(&self, document: &DocumentId) -> ConsoleResult<()> {
        if let Err(e) = self
            .tracked(Region::DocumentDelete, self.api.delete_document(document))
            .await
        {
            return Err(self.fail("delete document", e).await);
        }
        info!("Deleted document {}", document);
        self.apply(Action::DocumentDeleted(document.clone())).await;

        self.mount().await
    }

    pub async fn dismiss_error(&self) {
        self.apply(Action::ClearError).await;
    }

    async fn refresh_rules(&self, token: RequestToken) -> ConsoleResult<()> {
        let rules = match self
            .tracked(Region::Rules, self.api.fetch_rules(&token.document))
            .await
        {
            Ok(rules) => rules,
            Err(e) => {
                // A failure for a selection the user already left is stale too
                if self.state.read().await.token().as_ref() != Some(&token) {
                    warn!("Discarded stale rules failure for {}: {}", token.document, e);
                    return Ok(());
                }
                return Err(self.fail("load rules", e).await);
            }
        };

        let document = token.document.clone();
        let count = rules.len();
        match self.apply(Action::RulesLoaded { token, rules }).await {
            Applied::Changed => info!("Loaded {} rules for {}", count, document),
            Applied::Discarded => warn!("Discarded stale rules for {}", document),
        }
        Ok(())
    }

    async fn require_selection(&self) -> ConsoleResult<RequestToken> {
        let token = self.state.read().await.token();
        match token {
            Some(token) => Ok(token),
            None => Err(self.reject(ValidationError::NoDocumentSelected).await),
        }
    }

    async fn apply(&self, action: Action) -> Applied {
        self.state.write().await.apply(action)
    }

    /// Mark `region` loading while `call` is in flight
    async fn tracked<T>(&self, region: Region, call: impl Future<Output = T>) -> T {
        let loading = Loading::start(&self.state, region).await;
        let output = call.await;
        loading.finish().await;
        output
    }

    async fn fail(&self, action: &'static str, source: ClientError) -> ConsoleError {
        let err = ConsoleError::RequestFailed { action, source };
        let message = err.to_string();
        error!("{}", message);
        self.apply(Action::Failed(message.clone())).await;
        self.notifier.error(&message);
        err
    }

    async fn reject(&self, validation: ValidationError) -> ConsoleError {
        let message = validation.to_string();
        warn!("Rejected: {}", message);
        self.apply(Action::Failed(message.clone())).await;
        self.notifier.error(&message);
        ConsoleError::Validation(validation)
    }
}

/// Read-only access to the console state
#[derive(Clone)]
pub struct ConsoleView {
    state: Arc<RwLock<ConsoleState>>,
}

impl ConsoleView {
    pub async fn read(&self) -> RwLockReadGuard<'_, ConsoleState> {
        self.state.read().await
    }

    pub async fn snapshot(&self) -> ConsoleState {
        self.state.read().await.clone()
    }
}

/// A region marked loading; released on `finish` or on drop
///
/// Dropping happens when the caller abandons an operation mid-request, e.g.
/// under `tokio::time::timeout`.
struct Loading {
    state: Arc<RwLock<ConsoleState>>,
    region: Region,
    finished: bool,
}

impl Loading {
    async fn start(state: &Arc<RwLock<ConsoleState>>, region: Region) -> Self {
        state.write().await.apply(Action::Started(region));
        Self {
            state: Arc::clone(state),
            region,
            finished: false,
        }
    }

    async fn finish(mut self) {
        let mut state = self.state.write().await;
        state.apply(Action::Finished(self.region));
        self.finished = true;
    }
}

impl Drop for Loading {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let region = self.region;
        if let Ok(mut state) = self.state.try_write() {
            state.apply(Action::Finished(region));
            return;
        }

        // Lock busy: release from a task once it frees up
        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    state.write().await.apply(Action::Finished(region));
                });
            }
            Err(_) => warn!("{:?} left loading: no runtime to release it", region),
        }
    }
}
