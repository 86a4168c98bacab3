//! Shared helpers for console tests

use std::sync::{Arc, Mutex};

use compliance_client::{ClientConfig, ComplianceClient};
use compliance_console::{ComplianceConsole, Notifier};
use compliance_mock::{spawn, MockBackend, RunningBackend};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Keeps every notice for later assertions
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Error(message) => Some(message),
                Notice::Success(_) => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push(Notice::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push(Notice::Error(message.to_string()));
    }
}

pub struct Harness {
    pub backend: RunningBackend,
    pub console: ComplianceConsole<ComplianceClient, RecordingNotifier>,
    pub notifier: RecordingNotifier,
}

/// Console wired to a freshly spawned mock backend
pub async fn harness(backend: MockBackend) -> Harness {
    let backend = spawn(backend).await.unwrap();
    let client = ComplianceClient::new(&ClientConfig::new(backend.base_url.clone())).unwrap();
    let notifier = RecordingNotifier::default();
    let console = ComplianceConsole::with_notifier(client, notifier.clone());
    Harness {
        backend,
        console,
        notifier,
    }
}
