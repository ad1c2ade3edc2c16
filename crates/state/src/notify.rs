//! User-facing notifications.

/// Surfaces warnings and errors to the user.
pub trait Notifier: Send + Sync {
    fn warning(&self, message: &str);

    fn error(&self, message: &str);
}

/// [`Notifier`] that writes every notification to the `tracing` log.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    location: &'static str,
}

impl TracingNotifier {
    pub fn new(location: &'static str) -> Self {
        Self { location }
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new("Kibi State")
    }
}

impl Notifier for TracingNotifier {
    fn warning(&self, message: &str) {
        tracing::warn!(location = self.location, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(location = self.location, "{message}");
    }
}
