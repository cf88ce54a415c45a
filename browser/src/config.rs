use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run Chrome without a visible window. Interactive runs flip this off.
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default = "default_viewport")]
    pub viewport: ViewportConfig,

    #[serde(default = "default_wait")]
    pub wait: WaitStrategy,

    /// Persistent profile directory. When unset a throwaway profile is
    /// created under the system temp dir and removed on stop.
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,

    /// Keep the profile directory around after the session ends.
    #[serde(default)]
    pub persist_profile: bool,

    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            viewport: default_viewport(),
            wait: default_wait(),
            user_data_dir: None,
            persist_profile: false,
            launch_timeout_ms: default_launch_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,

    #[serde(default = "default_device_scale_factor")]
    pub device_scale_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitStrategy {
    Event(String),
    Delay { delay_ms: u64 },
}

fn default_headless() -> bool {
    true
}

fn default_viewport() -> ViewportConfig {
    ViewportConfig {
        width: 1024,
        height: 768,
        device_scale_factor: 1.0,
    }
}

fn default_wait() -> WaitStrategy {
    WaitStrategy::Event("domcontentloaded".to_string())
}

fn default_launch_timeout_ms() -> u64 {
    60_000
}

fn default_device_scale_factor() -> f64 {
    1.0
}
