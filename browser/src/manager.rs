use crate::{config::BrowserConfig, page::Page, BrowserError, Result};
use chromiumoxide::{Browser, BrowserConfig as CdpConfig};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the managed Chrome process for one automation run. The portal session
/// is single-seat, so there is exactly one page and no pooling.
pub struct BrowserManager {
    config: BrowserConfig,
    browser: Arc<Mutex<Option<Browser>>>,
    page: Arc<Mutex<Option<Arc<Page>>>>,
    user_data_dir: Arc<Mutex<Option<String>>>,
    cleanup_profile_on_stop: Arc<Mutex<bool>>,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: Arc::new(Mutex::new(None)),
            page: Arc::new(Mutex::new(None)),
            user_data_dir: Arc::new(Mutex::new(None)),
            cleanup_profile_on_stop: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut browser_guard = self.browser.lock().await;
        if browser_guard.is_some() {
            return Ok(());
        }

        info!("Launching browser instance");

        let mut builder = CdpConfig::builder();

        // Use persistent profile if specified, otherwise temp
        let user_data_path = if let Some(dir) = &self.config.user_data_dir {
            builder = builder.user_data_dir(dir.clone());
            dir.to_string_lossy().to_string()
        } else {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();
            let temp_path = std::env::temp_dir()
                .join(format!("mport-browser-{}-{timestamp}", std::process::id()));
            let temp_path = temp_path.to_string_lossy().to_string();

            if tokio::fs::metadata(&temp_path).await.is_ok() {
                if let Err(e) = tokio::fs::remove_dir_all(&temp_path).await {
                    warn!("Failed to cleanup existing browser directory {temp_path}: {e}");
                }
            }

            builder = builder.user_data_dir(&temp_path);
            temp_path
        };

        builder = builder.window_size(self.config.viewport.width, self.config.viewport.height);

        if self.config.headless {
            builder = builder.headless_mode(chromiumoxide::browser::HeadlessMode::New);
        } else {
            builder = builder.with_head();
        }

        builder = builder
            .launch_timeout(std::time::Duration::from_millis(self.config.launch_timeout_ms))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run");

        let browser_config = builder
            .build()
            .map_err(BrowserError::ConfigError)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {event:?}");
            }
        });

        *browser_guard = Some(browser);

        {
            let mut user_data_guard = self.user_data_dir.lock().await;
            *user_data_guard = Some(user_data_path);
        }

        let should_cleanup = self.config.user_data_dir.is_none() && !self.config.persist_profile;
        *self.cleanup_profile_on_stop.lock().await = should_cleanup;

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut page_guard = self.page.lock().await;
        *page_guard = None;
        drop(page_guard);

        let mut browser_guard = self.browser.lock().await;
        if let Some(mut browser) = browser_guard.take() {
            info!("Stopping browser");
            browser.close().await?;
            let _ = browser.wait().await;
        }
        drop(browser_guard);

        let should_cleanup = *self.cleanup_profile_on_stop.lock().await;
        if should_cleanup {
            let mut user_data_guard = self.user_data_dir.lock().await;
            if let Some(user_data_path) = user_data_guard.take() {
                // Give Chrome a moment to fully release the profile
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;

                if let Err(e) = tokio::fs::remove_dir_all(&user_data_path).await {
                    warn!("Failed to cleanup browser user data directory {user_data_path}: {e}");
                }
            }
        }

        Ok(())
    }

    pub async fn get_or_create_page(&self) -> Result<Arc<Page>> {
        let mut page_guard = self.page.lock().await;
        if let Some(page) = page_guard.as_ref() {
            return Ok(Arc::clone(page));
        }

        let browser_guard = self.browser.lock().await;
        let browser = browser_guard.as_ref().ok_or(BrowserError::NotInitialized)?;

        let cdp_page = browser.new_page("about:blank").await?;
        let page = Arc::new(Page::new(cdp_page, self.config.clone()));
        *page_guard = Some(Arc::clone(&page));

        Ok(page)
    }
}
