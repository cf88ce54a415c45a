use crate::config::{PortalConfig, RunOptions};
use crate::sequencer::Sequencer;
use crate::{Error, Result};
use mport_browser::{BrowserConfig, BrowserManager, Page};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One live connection to the portal: the managed browser plus its single
/// page, landed on the project-times view. Owned exclusively by the pipeline
/// that opened it; closed exactly once.
pub struct Session {
    manager: BrowserManager,
    page: Arc<Page>,
}

impl Session {
    /// Launch the browser, authenticate, and navigate to the project-times
    /// view. On return the session is ready for the first primitive action.
    pub async fn open(
        config: &PortalConfig,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let browser_config = BrowserConfig {
            headless: !options.interactive,
            user_data_dir: options.user_data_dir.clone(),
            persist_profile: options.user_data_dir.is_some(),
            ..BrowserConfig::default()
        };

        let manager = BrowserManager::new(browser_config);
        manager.start().await?;

        let session = match Self::bootstrap(&manager, config, options, cancel).await {
            Ok(page) => Self { manager, page },
            Err(e) => {
                // Best-effort teardown; the bootstrap error is the one worth surfacing
                if let Err(stop_err) = manager.stop().await {
                    warn!("Failed to stop browser after bootstrap error: {stop_err}");
                }
                return Err(e);
            }
        };

        info!("Session ready on {}", config.projects_url());
        Ok(session)
    }

    async fn bootstrap(
        manager: &BrowserManager,
        config: &PortalConfig,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<Arc<Page>> {
        let page = manager.get_or_create_page().await?;

        page.authenticate(&config.username, &config.password)
            .await
            .map_err(|e| Error::AuthenticationFailed(e.to_string()))?;

        page.goto(&config.base_url, None)
            .await
            .map_err(|e| Error::NavigationFailed(format!("{}: {e}", config.base_url)))?;

        let result = page
            .goto(&config.projects_url(), None)
            .await
            .map_err(|e| Error::NavigationFailed(format!("{}: {e}", config.projects_url())))?;

        if let Some(title) = &result.title {
            if title.contains("401") || title.contains("Unauthorized") {
                return Err(Error::AuthenticationFailed(format!(
                    "portal rejected the supplied credentials ({title})"
                )));
            }
        }

        // The view renders its widgets asynchronously after load with no
        // readiness signal; give it a bounded settle window.
        let seq = Sequencer::new(Arc::clone(&page), options.timing.clone(), cancel.clone());
        seq.settle().await?;

        Ok(page)
    }

    pub fn page(&self) -> Arc<Page> {
        Arc::clone(&self.page)
    }

    /// Tear the browser down. Best-effort: failures are logged, not returned,
    /// so a close on the error path never masks the original failure.
    pub async fn close(self) {
        if let Err(e) = self.manager.stop().await {
            warn!("Failed to close browser session: {e}");
        }
    }
}
