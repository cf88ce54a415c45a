//! The form-automation sequencer: six primitive actions against the portal's
//! asynchronously rendering form, each with a bounded wait. Fixed sleeps are
//! replaced by condition polls with exponential backoff; the only remaining
//! unconditional delay is `settle`, for the spots where the portal exposes no
//! readiness signal at all.

use crate::config::Timing;
use crate::selectors::FieldLocator;
use crate::{Error, Result};
use mport_browser::Page;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Proof that a locator resolved and was focused. Handles are cheap and only
/// valid against the page state they were created in; the portal re-renders
/// after every navigation.
#[derive(Debug, Clone)]
pub struct FieldHandle {
    locator: FieldLocator,
}

pub struct Sequencer {
    page: Arc<Page>,
    timing: Timing,
    cancel: CancellationToken,
}

impl Sequencer {
    pub fn new(page: Arc<Page>, timing: Timing, cancel: CancellationToken) -> Self {
        Self {
            page,
            timing,
            cancel,
        }
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    /// Cooperative cancellation, checked before every primitive.
    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Locate and focus an element. The lookup window is bounded; an element
    /// that never resolves is a broken selector contract, not a slow page.
    pub async fn focus(&self, locator: &FieldLocator) -> Result<FieldHandle> {
        self.check_cancelled()?;
        debug!("Focusing {locator}");

        let page = &*self.page;
        let css = locator.as_css();
        let result = poll_until(
            &format!("element {locator}"),
            self.timing.lookup_timeout,
            self.timing.poll_initial,
            self.timing.poll_max,
            move || async move { Ok(page.focus(css).await?) },
        )
        .await;

        match result {
            Ok(()) => Ok(FieldHandle {
                locator: locator.clone(),
            }),
            Err(Error::Timeout { .. }) => Err(Error::ElementNotFound {
                selector: locator.as_css().to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Empty the field. No-op if it is already empty.
    pub async fn clear(&self, handle: &FieldHandle) -> Result<()> {
        self.check_cancelled()?;
        self.page.clear_value(handle.locator.as_css()).await?;
        Ok(())
    }

    /// Inject text with the configured inter-keystroke delay.
    pub async fn type_text(&self, handle: &FieldHandle, text: &str) -> Result<()> {
        self.check_cancelled()?;
        debug!("Typing into {}: {text}", handle.locator);
        self.page.type_text(text, self.timing.type_delay).await?;
        Ok(())
    }

    /// Block until the loading indicator transitions visible -> hidden,
    /// signalling that the dependent dropdown finished repopulating. Both
    /// phases are bounded: an indicator that never shows up means the typed
    /// text matched nothing the portal cared about.
    pub async fn await_dynamic_list(&self, indicator: &FieldLocator) -> Result<()> {
        self.check_cancelled()?;
        debug!("Waiting for loading indicator {indicator}");

        let page = &*self.page;
        let css = indicator.as_css();
        poll_until(
            &format!("loading indicator {indicator} to appear"),
            self.timing.indicator_timeout,
            self.timing.poll_initial,
            self.timing.poll_max,
            move || async move { Ok(page.is_visible(css).await?) },
        )
        .await?;

        poll_until(
            &format!("loading indicator {indicator} to disappear"),
            self.timing.indicator_timeout,
            self.timing.poll_initial,
            self.timing.poll_max,
            move || async move { Ok(!page.is_visible(css).await?) },
        )
        .await
    }

    /// Commit whatever suggestion the portal auto-highlighted after typing.
    /// Which suggestion that actually was is not verified.
    pub async fn confirm_first_suggestion(&self, handle: &FieldHandle) -> Result<()> {
        self.check_cancelled()?;
        debug!("Confirming suggestion in {}", handle.locator);
        self.page.press_key("Enter").await?;
        Ok(())
    }

    /// Block until the document reports the next load-complete event.
    pub async fn await_navigation(&self) -> Result<()> {
        self.check_cancelled()?;
        debug!("Waiting for navigation");

        let window = self.timing.navigation_timeout;
        match timeout(window, self.page.wait_for_navigation()).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(Error::Timeout {
                what: "navigation".to_string(),
                waited: window,
            }),
        }
    }

    /// Minimum settle delay for the places with no observable readiness
    /// signal (the portal's initial render after login is one).
    pub async fn settle(&self) -> Result<()> {
        self.check_cancelled()?;
        sleep(self.timing.settle_delay).await;
        Ok(())
    }

    /// The repeated pattern of both pipelines: focus, clear, type the label,
    /// wait for the dependent list, commit the suggestion, wait for the
    /// resulting navigation.
    pub async fn select_from_dropdown(
        &self,
        input: &FieldLocator,
        indicator: &FieldLocator,
        label: &str,
    ) -> Result<()> {
        let handle = self.focus(input).await?;
        self.clear(&handle).await?;
        self.type_text(&handle, label).await?;
        self.await_dynamic_list(indicator).await?;
        self.confirm_first_suggestion(&handle).await?;
        self.await_navigation().await
    }

    /// Trimmed text of every node the locator matches, in document order.
    pub async fn read_labels(&self, locator: &FieldLocator) -> Result<Vec<String>> {
        self.check_cancelled()?;
        Ok(self.page.query_text_all(locator.as_css()).await?)
    }

    /// Click a control, bounded by the lookup window.
    pub async fn click(&self, locator: &FieldLocator) -> Result<()> {
        self.check_cancelled()?;
        debug!("Clicking {locator}");

        let page = &*self.page;
        let css = locator.as_css();
        let result = poll_until(
            &format!("element {locator}"),
            self.timing.lookup_timeout,
            self.timing.poll_initial,
            self.timing.poll_max,
            move || async move { Ok(page.click_element(css).await?) },
        )
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(Error::Timeout { .. }) => Err(Error::ElementNotFound {
                selector: locator.as_css().to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Poll `probe` until it reports readiness, with exponential backoff from
/// `poll_initial` up to `poll_max`, giving up after `window`.
pub(crate) async fn poll_until<F, Fut>(
    what: &str,
    window: Duration,
    poll_initial: Duration,
    poll_max: Duration,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut interval = poll_initial;

    loop {
        if probe().await? {
            return Ok(());
        }
        if start.elapsed() >= window {
            return Err(Error::Timeout {
                what: what.to_string(),
                waited: start.elapsed(),
            });
        }
        sleep(interval).await;
        interval = (interval * 2).min(poll_max);
    }
}
