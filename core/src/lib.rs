pub mod config;
pub mod discover;
pub mod portal;
pub mod progress;
pub mod replay;
pub mod selectors;
pub mod sequencer;
pub mod session;
pub mod transcript;

pub use config::PortalConfig;
pub use config::RunOptions;
pub use config::Timing;
pub use portal::PortalSession;
pub use portal::PortalUi;
pub use progress::ProgressObserver;
pub use selectors::FieldLocator;
pub use selectors::PortalSelectors;
pub use session::Session;
pub use transcript::BookingRecord;
pub use transcript::ProjectRecord;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required configuration: {0}")]
    ConfigurationMissing(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("timed out waiting for {what} after {waited:?}")]
    Timeout { what: String, waited: Duration },

    #[error("transcript line {line}: {message}")]
    TranscriptFormat { line: usize, message: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Browser(#[from] mport_browser::BrowserError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
