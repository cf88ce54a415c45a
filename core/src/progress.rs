use crate::Error;
use tracing::{error, info};

/// Narrow observer for per-item progress, passed into a pipeline invocation.
/// No global state: whoever runs a pipeline decides where progress goes.
pub trait ProgressObserver: Send {
    fn on_start(&mut self, _total: usize) {}
    fn on_item(&mut self, _index: usize, _label: &str) {}
    fn on_end(&mut self) {}
    fn on_error(&mut self, _index: Option<usize>, _error: &Error) {}
}

/// Reports progress through `tracing`, one line per item. The error hook
/// names the failing item index so an aborted replay can be resumed manually
/// from the right transcript row.
#[derive(Default)]
pub struct LogObserver {
    total: usize,
}

impl ProgressObserver for LogObserver {
    fn on_start(&mut self, total: usize) {
        self.total = total;
        info!("Starting run over {total} item(s)");
    }

    fn on_item(&mut self, index: usize, label: &str) {
        info!("[{}/{}] {label}", index + 1, self.total);
    }

    fn on_end(&mut self) {
        info!("Run complete");
    }

    fn on_error(&mut self, index: Option<usize>, err: &Error) {
        match index {
            Some(i) => error!("Run aborted at item {} (0-based index {i}): {err}", i + 1),
            None => error!("Run aborted before the first item: {err}"),
        }
    }
}

/// Discards all notifications.
#[derive(Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}
