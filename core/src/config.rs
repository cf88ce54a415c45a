use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Connection details for the portal, read from the environment after
/// `dotenvy` has loaded any `.env` file. All four keys are required; the run
/// fails fast before a browser is spawned when one is absent.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub projects_path: String,
    pub username: String,
    pub password: String,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::ConfigurationMissing(key.to_string()))
        };

        Ok(Self {
            base_url: require("BASE_URL")?,
            projects_path: require("PROJECTS_URL")?,
            username: require("AUTH_USER")?,
            password: require("AUTH_PASS")?,
        })
    }

    /// Absolute URL of the project-times view.
    pub fn projects_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.projects_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Per-run knobs assembled by the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Show the browser window instead of running headless.
    pub interactive: bool,
    /// Persistent browser profile directory, kept across runs.
    pub user_data_dir: Option<PathBuf>,
    /// When set, checkpoint screenshots are written here.
    pub screenshot_dir: Option<PathBuf>,
    pub timing: Timing,
}

/// Waiting policy for the sequencer. Every bounded wait in the system takes
/// its window from here; there are no other sleeps.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Inter-keystroke delay while typing into portal fields.
    pub type_delay: Duration,
    /// Window for an element lookup to resolve before `ElementNotFound`.
    pub lookup_timeout: Duration,
    /// Window for the loading indicator to appear, and again to disappear.
    pub indicator_timeout: Duration,
    /// Window for a navigation/load-complete event.
    pub navigation_timeout: Duration,
    /// Minimum settle delay where the portal offers no readiness signal.
    pub settle_delay: Duration,
    /// First polling interval of the readiness backoff.
    pub poll_initial: Duration,
    /// Polling interval ceiling.
    pub poll_max: Duration,
    /// Optional ceiling over the whole pipeline run.
    pub run_deadline: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            type_delay: Duration::from_millis(15),
            lookup_timeout: Duration::from_secs(10),
            indicator_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(2),
            poll_initial: Duration::from_millis(50),
            poll_max: Duration::from_secs(1),
            run_deadline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn reads_all_required_keys() {
        let cfg = PortalConfig::from_lookup(env(&[
            ("BASE_URL", "https://portal.example.com"),
            ("PROJECTS_URL", "/times/projects.aspx"),
            ("AUTH_USER", "user"),
            ("AUTH_PASS", "pass"),
        ]))
        .unwrap();

        assert_eq!(cfg.base_url, "https://portal.example.com");
        assert_eq!(
            cfg.projects_url(),
            "https://portal.example.com/times/projects.aspx"
        );
    }

    #[test]
    fn missing_key_fails_fast_with_its_name() {
        let err = PortalConfig::from_lookup(env(&[
            ("BASE_URL", "https://portal.example.com"),
            ("PROJECTS_URL", "/times/projects.aspx"),
            ("AUTH_USER", "user"),
        ]))
        .unwrap_err();

        match err {
            Error::ConfigurationMissing(key) => assert_eq!(key, "AUTH_PASS"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let err = PortalConfig::from_lookup(env(&[
            ("BASE_URL", "  "),
            ("PROJECTS_URL", "/p"),
            ("AUTH_USER", "u"),
            ("AUTH_PASS", "p"),
        ]))
        .unwrap_err();

        match err {
            Error::ConfigurationMissing(key) => assert_eq!(key, "BASE_URL"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn projects_url_joins_without_duplicate_slash() {
        let cfg = PortalConfig::from_lookup(env(&[
            ("BASE_URL", "https://portal.example.com/"),
            ("PROJECTS_URL", "/times/projects.aspx"),
            ("AUTH_USER", "u"),
            ("AUTH_PASS", "p"),
        ]))
        .unwrap();

        assert_eq!(
            cfg.projects_url(),
            "https://portal.example.com/times/projects.aspx"
        );
    }
}
