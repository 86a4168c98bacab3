//! User-facing notifications

/// Where success and error notices go
///
/// An embedding UI shows these as toasts or dialogs. Error notices block the
/// user until acknowledged; the console does not wait for that.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "compliance_console::notify", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "compliance_console::notify", "{}", message);
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn success(&self, message: &str) {
        (**self).success(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }
}
