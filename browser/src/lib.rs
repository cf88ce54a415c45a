pub mod config;
pub mod manager;
pub mod page;

pub use config::BrowserConfig;
pub use config::ViewportConfig;
pub use config::WaitStrategy;
pub use manager::BrowserManager;
pub use page::Page;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser not initialized")]
    NotInitialized,

    #[error("CDP error: {0}")]
    CdpError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Screenshot failed: {0}")]
    ScreenshotError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowserError::CdpError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;
