//! Installed server plugins, fetched once and cached.

use std::sync::Arc;

use async_trait::async_trait;
use kibi_core::StateResult;
use tokio::sync::OnceCell;

/// Name of the plugin providing relational joins. Required by `get_state`.
pub const SIREN_VANGUARD_PLUGIN: &str = "siren-vanguard";

/// Lists the plugins installed on the search backend.
#[async_trait]
pub trait PluginSource: Send + Sync {
    async fn installed_plugins(&self) -> StateResult<Vec<String>>;
}

/// Process-wide cache of the installed plugin names.
///
/// [`PluginRegistry::init`] fetches the list once; later calls are no-ops.
/// Before initialization every plugin is reported as missing.
pub struct PluginRegistry {
    source: Arc<dyn PluginSource>,
    plugins: OnceCell<Vec<String>>,
}

impl PluginRegistry {
    pub fn new(source: Arc<dyn PluginSource>) -> Self {
        Self {
            source,
            plugins: OnceCell::new(),
        }
    }

    /// Fetch the plugin list if it has not been fetched yet.
    ///
    /// A failed fetch leaves the cache empty so that a later call retries.
    pub async fn init(&self) -> StateResult<()> {
        let plugins = self
            .plugins
            .get_or_try_init(|| self.source.installed_plugins())
            .await?;
        tracing::debug!(count = plugins.len(), "Installed plugins fetched");
        Ok(())
    }

    /// The cached plugin names, `None` before [`init`](Self::init).
    pub fn plugins(&self) -> Option<&[String]> {
        self.plugins.get().map(Vec::as_slice)
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.plugins()
            .is_some_and(|plugins| plugins.iter().any(|plugin| plugin == name))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use kibi_core::StateError;

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl PluginSource for CountingSource {
        async fn installed_plugins(&self) -> StateResult<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(StateError::Backend("unreachable".to_string()));
            }
            Ok(vec![SIREN_VANGUARD_PLUGIN.to_string(), "analysis-icu".to_string()])
        }
    }

    fn registry(fail_first: bool) -> (PluginRegistry, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail_first,
        });
        (PluginRegistry::new(source.clone()), source)
    }

    #[tokio::test]
    async fn nothing_is_installed_before_init() {
        let (registry, _) = registry(false);
        assert!(registry.plugins().is_none());
        assert!(!registry.is_installed(SIREN_VANGUARD_PLUGIN));
    }

    #[tokio::test]
    async fn init_fetches_once() {
        let (registry, source) = registry(false);
        registry.init().await.unwrap();
        registry.init().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_installed(SIREN_VANGUARD_PLUGIN));
        assert!(!registry.is_installed("x-pack"));
    }

    #[tokio::test]
    async fn failed_init_is_retried() {
        let (registry, source) = registry(true);
        assert!(registry.init().await.is_err());
        assert!(registry.plugins().is_none());
        registry.init().await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(registry.is_installed("analysis-icu"));
    }
}
