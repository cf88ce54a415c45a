//! Replay pipeline: drive one full select/select/set/set/set/submit cycle
//! per booking record, strictly sequentially.

use crate::portal::{today_ddmmyyyy, PortalUi};
use crate::progress::ProgressObserver;
use crate::transcript::BookingRecord;
use crate::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Book every record, in transcript order. A failing record is run-fatal:
/// the observer and the log name its index, the remaining records stay
/// unprocessed, and the caller resumes from a trimmed transcript by hand.
/// Returns the number of records booked.
pub async fn run_replay(
    ui: &mut dyn PortalUi,
    records: &[BookingRecord],
    observer: &mut dyn ProgressObserver,
    cancel: &CancellationToken,
) -> Result<usize> {
    // Failures outside any record report without an index
    if let Err(e) = ui.checkpoint("run-start").await {
        observer.on_error(None, &e);
        return Err(e);
    }

    info!("Replaying {} booking record(s)", records.len());
    observer.on_start(records.len());

    for (index, record) in records.iter().enumerate() {
        if let Err(e) = book(ui, cancel, index, record).await {
            observer.on_error(Some(index), &e);
            return Err(e);
        }
        observer.on_item(index, &record.project);
    }

    if let Err(e) = ui.checkpoint("run-end").await {
        observer.on_error(None, &e);
        return Err(e);
    }
    observer.on_end();
    Ok(records.len())
}

async fn book(
    ui: &mut dyn PortalUi,
    cancel: &CancellationToken,
    index: usize,
    record: &BookingRecord,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    ui.select_project(&record.project).await?;
    ui.select_registration(&record.registration).await?;

    // The portal does not reload when the typed date already equals today,
    // so the suggestion-confirm and navigation-wait sub-steps are skipped
    // for exactly that literal match.
    let confirm = record.date != today_ddmmyyyy();
    ui.set_date(&record.date, confirm).await?;

    ui.set_duration(&record.duration).await?;
    ui.set_comment(&record.comment).await?;
    ui.submit().await?;

    ui.checkpoint(&format!("record-{index}")).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::portal::testing::FakePortal;
    use crate::progress::NullObserver;
    use crate::transcript::parse_bookings;
    use pretty_assertions::assert_eq;

    fn record(project: &str, date: &str) -> BookingRecord {
        BookingRecord {
            project: project.to_string(),
            registration: "Reg1".to_string(),
            date: date.to_string(),
            duration: "2:00".to_string(),
            comment: "Test comment".to_string(),
        }
    }

    #[tokio::test]
    async fn one_record_drives_one_full_cycle_in_order() {
        let transcript = "Project;Registration;Date;Duration;Comment\n\
                          ProjectA;Reg1;01.01.2024;2:00;Test comment\n";
        let records = parse_bookings(transcript).unwrap();

        let mut ui = FakePortal::default();
        let cancel = CancellationToken::new();
        let booked = run_replay(&mut ui, &records, &mut NullObserver, &cancel)
            .await
            .unwrap();

        assert_eq!(booked, 1);
        assert_eq!(
            ui.ops,
            vec![
                "checkpoint:run-start",
                "select_project:ProjectA",
                "select_registration:Reg1",
                "set_date:01.01.2024:confirm=true",
                "set_duration:2:00",
                "set_comment:Test comment",
                "submit",
                "checkpoint:record-0",
                "checkpoint:run-end",
            ]
        );
    }

    #[tokio::test]
    async fn records_never_interleave() {
        let records = vec![record("A", "01.01.2024"), record("B", "02.01.2024")];
        let mut ui = FakePortal::default();
        let cancel = CancellationToken::new();

        run_replay(&mut ui, &records, &mut NullObserver, &cancel)
            .await
            .unwrap();

        // Record B's first step comes only after record A's submit.
        let submit_a = ui.ops.iter().position(|op| op == "submit").unwrap();
        let select_b = ui
            .ops
            .iter()
            .position(|op| op == "select_project:B")
            .unwrap();
        assert!(submit_a < select_b);
    }

    #[tokio::test]
    async fn todays_date_skips_confirm_and_navigation() {
        let today = today_ddmmyyyy();
        let records = vec![record("A", &today), record("B", "01.01.2024")];
        let mut ui = FakePortal::default();
        let cancel = CancellationToken::new();

        run_replay(&mut ui, &records, &mut NullObserver, &cancel)
            .await
            .unwrap();

        assert!(ui.ops.contains(&format!("set_date:{today}:confirm=false")));
        assert!(ui
            .ops
            .contains(&"set_date:01.01.2024:confirm=true".to_string()));
    }

    #[tokio::test]
    async fn failure_is_run_fatal_and_names_the_record() {
        let records = vec![
            record("A", "01.01.2024"),
            record("B", "02.01.2024"),
            record("C", "03.01.2024"),
        ];
        let mut ui = FakePortal::default();
        // ops: checkpoint + 7 per record; fail record B's select_project.
        ui.fail_at_op = Some(8);

        struct ErrorRecorder {
            failed_index: Option<usize>,
        }
        impl ProgressObserver for ErrorRecorder {
            fn on_error(&mut self, index: Option<usize>, _error: &Error) {
                self.failed_index = index;
            }
        }

        let mut observer = ErrorRecorder { failed_index: None };
        let cancel = CancellationToken::new();
        let err = run_replay(&mut ui, &records, &mut observer, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(observer.failed_index, Some(1));
        assert!(!ui.ops.iter().any(|op| op == "select_project:C"));
    }

    #[tokio::test]
    async fn failing_start_checkpoint_reaches_the_observer() {
        struct ErrorRecorder {
            calls: Vec<Option<usize>>,
        }
        impl ProgressObserver for ErrorRecorder {
            fn on_error(&mut self, index: Option<usize>, _error: &Error) {
                self.calls.push(index);
            }
        }

        let records = vec![record("A", "01.01.2024")];
        let mut ui = FakePortal::default();
        // Op 0 is the run-start checkpoint
        ui.fail_at_op = Some(0);

        let mut observer = ErrorRecorder { calls: Vec::new() };
        let cancel = CancellationToken::new();
        let err = run_replay(&mut ui, &records, &mut observer, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(observer.calls, vec![None]);
        assert!(!ui.ops.iter().any(|op| op.starts_with("select_project")));
    }

    #[tokio::test]
    async fn cancellation_stops_between_records() {
        let records = vec![record("A", "01.01.2024")];
        let mut ui = FakePortal::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_replay(&mut ui, &records, &mut NullObserver, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!ui.ops.iter().any(|op| op.starts_with("select_project")));
    }
}
