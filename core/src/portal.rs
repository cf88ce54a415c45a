//! Semantic bindings for the project-times view: the [`PortalUi`] seam the
//! pipelines drive, and [`PortalSession`], its browser-backed implementation.

use crate::selectors::PortalSelectors;
use crate::sequencer::Sequencer;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

/// What the pipelines need from the portal. Kept narrow so tests can drive
/// the pipelines with a scripted fake instead of a browser.
#[async_trait]
pub trait PortalUi: Send {
    /// Labels of every project in the top-level dropdown. Read once per run;
    /// the iteration plan is deliberately NOT refreshed if the remote list
    /// changes mid-run (stale entries then fail their select with a timeout).
    async fn project_labels(&mut self) -> Result<Vec<String>>;

    /// Select a project by label and wait for the view to reload.
    async fn select_project(&mut self, label: &str) -> Result<()>;

    /// Labels of the registration categories currently offered, i.e. the
    /// dependent list of the last selected project.
    async fn registration_labels(&mut self) -> Result<Vec<String>>;

    /// Select a registration category by label and wait for the reload.
    async fn select_registration(&mut self, label: &str) -> Result<()>;

    /// Fill the date field. With `confirm` the portal's auto-highlighted
    /// suggestion is committed and the resulting reload awaited; without it
    /// the literal text is left as-is (the portal does not reload when the
    /// date already equals today).
    async fn set_date(&mut self, date: &str, confirm: bool) -> Result<()>;

    async fn set_duration(&mut self, duration: &str) -> Result<()>;

    async fn set_comment(&mut self, comment: &str) -> Result<()>;

    /// Submit the booking form and wait for the portal to land back on the
    /// list view, ready for the next record.
    async fn submit(&mut self) -> Result<()>;

    /// Capture a checkpoint screenshot when a screenshot directory is
    /// configured; otherwise a no-op.
    async fn checkpoint(&mut self, label: &str) -> Result<()>;
}

/// Current calendar date the way the portal renders dates: `dd.mm.yyyy`.
pub fn today_ddmmyyyy() -> String {
    chrono::Local::now().format("%d.%m.%Y").to_string()
}

/// Browser-backed [`PortalUi`] over the sequencer primitives.
pub struct PortalSession {
    seq: Sequencer,
    selectors: PortalSelectors,
    shots: Option<ScreenshotSink>,
}

impl PortalSession {
    pub fn new(
        seq: Sequencer,
        selectors: PortalSelectors,
        screenshot_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            seq,
            selectors,
            shots: screenshot_dir.map(ScreenshotSink::new),
        }
    }

    async fn fill_plain(&self, locator: &crate::FieldLocator, text: &str) -> Result<()> {
        let handle = self.seq.focus(locator).await?;
        self.seq.clear(&handle).await?;
        self.seq.type_text(&handle, text).await
    }
}

#[async_trait]
impl PortalUi for PortalSession {
    async fn project_labels(&mut self) -> Result<Vec<String>> {
        self.seq.read_labels(&self.selectors.project_options).await
    }

    async fn select_project(&mut self, label: &str) -> Result<()> {
        info!("Selecting project '{label}'");
        self.seq
            .select_from_dropdown(
                &self.selectors.project_input,
                &self.selectors.project_loading,
                label,
            )
            .await
    }

    async fn registration_labels(&mut self) -> Result<Vec<String>> {
        self.seq
            .read_labels(&self.selectors.registration_options)
            .await
    }

    async fn select_registration(&mut self, label: &str) -> Result<()> {
        info!("Selecting registration '{label}'");
        self.seq
            .select_from_dropdown(
                &self.selectors.registration_input,
                &self.selectors.registration_loading,
                label,
            )
            .await
    }

    async fn set_date(&mut self, date: &str, confirm: bool) -> Result<()> {
        debug!("Setting date '{date}' (confirm: {confirm})");
        let handle = self.seq.focus(&self.selectors.date_input).await?;
        self.seq.clear(&handle).await?;
        self.seq.type_text(&handle, date).await?;
        if confirm {
            self.seq.confirm_first_suggestion(&handle).await?;
            self.seq.await_navigation().await?;
        }
        Ok(())
    }

    async fn set_duration(&mut self, duration: &str) -> Result<()> {
        debug!("Setting duration '{duration}'");
        self.fill_plain(&self.selectors.duration_input, duration).await
    }

    async fn set_comment(&mut self, comment: &str) -> Result<()> {
        debug!("Setting comment");
        self.fill_plain(&self.selectors.comment_input, comment).await
    }

    async fn submit(&mut self) -> Result<()> {
        info!("Submitting booking");
        self.seq.click(&self.selectors.submit_button).await?;
        self.seq.await_navigation().await
    }

    async fn checkpoint(&mut self, label: &str) -> Result<()> {
        let Some(sink) = self.shots.as_mut() else {
            return Ok(());
        };
        let bytes = self.seq.page().screenshot_viewport().await?;
        sink.store(label, &bytes).await
    }
}

/// Writes numbered checkpoint screenshots into the configured directory.
struct ScreenshotSink {
    dir: PathBuf,
    next_index: usize,
}

impl ScreenshotSink {
    fn new(dir: PathBuf) -> Self {
        Self { dir, next_index: 0 }
    }

    async fn store(&mut self, label: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let safe: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{:03}-{safe}.png", self.next_index));
        tokio::fs::write(&path, bytes).await?;
        debug!("Checkpoint screenshot written to {}", path.display());
        self.next_index += 1;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn today_matches_portal_date_format() {
        let today = today_ddmmyyyy();
        assert_eq!(today.len(), 10);
        let parts: Vec<&str> = today.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 4);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())));
    }
}
