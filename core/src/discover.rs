//! Discovery pipeline: enumerate the projects once, then walk them one by
//! one, reading the dependent registration list after each selection.

use crate::portal::PortalUi;
use crate::progress::ProgressObserver;
use crate::transcript::{DiscoveryWriter, ProjectRecord};
use crate::{Error, Result};
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Walk every project and record its registrations into `writer`. The
/// delimited writer commits each record immediately, so rows read before a
/// later failure survive on disk; the caller finalizes the writer only on
/// success (the JSON variant buffers until then, by design).
///
/// Any per-item failure aborts the whole run. Returns the number of projects
/// visited.
pub async fn run_discovery<W: Write>(
    ui: &mut dyn PortalUi,
    writer: &mut DiscoveryWriter<W>,
    observer: &mut dyn ProgressObserver,
    cancel: &CancellationToken,
) -> Result<usize> {
    // Failures outside any item report without an index
    if let Err(e) = ui.checkpoint("run-start").await {
        observer.on_error(None, &e);
        return Err(e);
    }

    let labels = match ui.project_labels().await {
        Ok(labels) => labels,
        Err(e) => {
            observer.on_error(None, &e);
            return Err(e);
        }
    };

    info!("Discovered {} project(s)", labels.len());
    observer.on_start(labels.len());

    // The label list is captured once and never re-read: if the portal's
    // list changes mid-run, stale entries stay in the iteration plan and
    // fail their select with a timeout rather than being skipped silently.
    for (index, label) in labels.iter().enumerate() {
        if let Err(e) = visit_project(ui, writer, cancel, index, label).await {
            observer.on_error(Some(index), &e);
            return Err(e);
        }
        observer.on_item(index, label);
    }

    if let Err(e) = ui.checkpoint("run-end").await {
        observer.on_error(None, &e);
        return Err(e);
    }
    observer.on_end();
    Ok(labels.len())
}

async fn visit_project<W: Write>(
    ui: &mut dyn PortalUi,
    writer: &mut DiscoveryWriter<W>,
    cancel: &CancellationToken,
    index: usize,
    label: &str,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    ui.select_project(label).await?;
    let registrations = ui.registration_labels().await?;

    writer.write_record(&ProjectRecord {
        name: label.to_string(),
        registrations,
    })?;

    ui.checkpoint(&format!("project-{index}")).await
}
