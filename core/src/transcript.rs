//! Transcript files: the `;`-delimited booking list consumed by replay and
//! the project/registration listing produced by discovery.
//!
//! Discovery output exists in two canonical shapes:
//! - delimited (`Project;Registrations`), streamed row by row so partial
//!   output survives a crash; registrations are joined with the `|`
//!   sub-delimiter and projects without registrations are skipped;
//! - JSON (an array of `{project, registrations}` objects), buffered and
//!   written at finalize; empty registration lists are kept.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

pub const BOOKING_HEADER: &str = "Project;Registration;Date;Duration;Comment";
pub const DISCOVERY_HEADER: &str = "Project;Registrations";

/// Separates registration names inside the single delimited cell.
pub const SUB_DELIMITER: char = '|';

/// One row of the replay input. Fields are free text; the remote UI is the
/// only validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub project: String,
    pub registration: String,
    /// `dd.mm.yyyy` by convention.
    pub date: String,
    pub duration: String,
    pub comment: String,
}

/// One project discovered in the portal, with its registration categories in
/// the order the portal listed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "project")]
    pub name: String,
    pub registrations: Vec<String>,
}

/// Parse a replay transcript. Full-line comments (`#`) and blank lines are
/// ignored; the first significant line must be the header row. The comment
/// column is last and may itself contain the delimiter.
pub fn parse_bookings(input: &str) -> Result<Vec<BookingRecord>> {
    let mut records = Vec::new();
    let mut header_seen = false;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if !header_seen {
            if !line.eq_ignore_ascii_case(BOOKING_HEADER) {
                return Err(Error::TranscriptFormat {
                    line: line_no,
                    message: format!("expected header '{BOOKING_HEADER}', found '{line}'"),
                });
            }
            header_seen = true;
            continue;
        }

        let fields: Vec<&str> = line.splitn(5, ';').collect();
        if fields.len() != 5 {
            return Err(Error::TranscriptFormat {
                line: line_no,
                message: format!("expected 5 fields separated by ';', found {}", fields.len()),
            });
        }

        records.push(BookingRecord {
            project: fields[0].trim().to_string(),
            registration: fields[1].trim().to_string(),
            date: fields[2].trim().to_string(),
            duration: fields[3].trim().to_string(),
            comment: fields[4].trim().to_string(),
        });
    }

    if !header_seen {
        return Err(Error::TranscriptFormat {
            line: 1,
            message: format!("transcript has no header row '{BOOKING_HEADER}'"),
        });
    }

    Ok(records)
}

/// Parse a delimited discovery transcript back into project records.
pub fn parse_discovery(input: &str) -> Result<Vec<ProjectRecord>> {
    let mut records = Vec::new();
    let mut header_seen = false;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if !header_seen {
            if !line.eq_ignore_ascii_case(DISCOVERY_HEADER) {
                return Err(Error::TranscriptFormat {
                    line: line_no,
                    message: format!("expected header '{DISCOVERY_HEADER}', found '{line}'"),
                });
            }
            header_seen = true;
            continue;
        }

        let Some((name, cell)) = line.split_once(';') else {
            return Err(Error::TranscriptFormat {
                line: line_no,
                message: "expected 'Project;Registrations'".to_string(),
            });
        };

        let registrations = cell
            .split(SUB_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        records.push(ProjectRecord {
            name: name.trim().to_string(),
            registrations,
        });
    }

    Ok(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryFormat {
    Delimited,
    Json,
}

/// Sink for discovery results. The delimited variant streams: each record is
/// written and flushed as soon as it is complete, so everything read before a
/// later failure is preserved on disk.
pub struct DiscoveryWriter<W: Write> {
    out: W,
    format: DiscoveryFormat,
    buffered: Vec<ProjectRecord>,
    rows_written: usize,
}

impl<W: Write> DiscoveryWriter<W> {
    pub fn new(mut out: W, format: DiscoveryFormat) -> Result<Self> {
        if format == DiscoveryFormat::Delimited {
            writeln!(out, "{DISCOVERY_HEADER}")?;
            out.flush()?;
        }
        Ok(Self {
            out,
            format,
            buffered: Vec::new(),
            rows_written: 0,
        })
    }

    pub fn write_record(&mut self, record: &ProjectRecord) -> Result<()> {
        match self.format {
            DiscoveryFormat::Json => {
                self.buffered.push(record.clone());
                self.rows_written += 1;
            }
            DiscoveryFormat::Delimited => {
                if record.registrations.is_empty() {
                    tracing::debug!(
                        "Skipping '{}' in delimited output: no registrations",
                        record.name
                    );
                    return Ok(());
                }
                let row = self.rows_written + 1;
                check_reserved(&record.name, row)?;
                for registration in &record.registrations {
                    check_reserved(registration, row)?;
                }
                writeln!(
                    self.out,
                    "{};{}",
                    record.name,
                    join_registrations(&record.registrations)
                )?;
                self.out.flush()?;
                self.rows_written += 1;
            }
        }
        Ok(())
    }

    /// Number of records committed to the sink so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn finish(mut self) -> Result<usize> {
        if self.format == DiscoveryFormat::Json {
            serde_json::to_writer_pretty(&mut self.out, &self.buffered)?;
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(self.rows_written)
    }
}

fn join_registrations(registrations: &[String]) -> String {
    registrations.join(&SUB_DELIMITER.to_string())
}

/// A project or registration name containing a delimiter cannot be encoded
/// unambiguously; refuse rather than corrupt the transcript.
fn check_reserved(value: &str, row: usize) -> Result<()> {
    if value.contains(';') || value.contains(SUB_DELIMITER) {
        return Err(Error::TranscriptFormat {
            line: row,
            message: format!("name '{value}' contains a reserved delimiter (';' or '|')"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
# weekly bookings
Project;Registration;Date;Duration;Comment

ProjectA;Reg1;01.01.2024;2:00;Test comment
ProjectB;Reg2;02.01.2024;0:30;standup; with details
";

    #[test]
    fn parses_rows_skipping_comments_and_blanks() {
        let records = parse_bookings(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            BookingRecord {
                project: "ProjectA".to_string(),
                registration: "Reg1".to_string(),
                date: "01.01.2024".to_string(),
                duration: "2:00".to_string(),
                comment: "Test comment".to_string(),
            }
        );
        // The comment column is last and keeps embedded delimiters.
        assert_eq!(records[1].comment, "standup; with details");
    }

    #[test]
    fn rejects_row_with_too_few_fields() {
        let input = "Project;Registration;Date;Duration;Comment\nProjectA;Reg1;01.01.2024\n";
        let err = parse_bookings(input).unwrap_err();
        match err {
            Error::TranscriptFormat { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("found 3"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_missing_header() {
        let err = parse_bookings("ProjectA;Reg1;01.01.2024;2:00;x\n").unwrap_err();
        assert!(matches!(err, Error::TranscriptFormat { line: 1, .. }));
    }

    #[test]
    fn rejects_empty_file() {
        let err = parse_bookings("# nothing here\n\n").unwrap_err();
        assert!(matches!(err, Error::TranscriptFormat { .. }));
    }

    fn sample_projects() -> Vec<ProjectRecord> {
        vec![
            ProjectRecord {
                name: "Alpha".to_string(),
                registrations: vec!["Development".to_string(), "Review".to_string()],
            },
            ProjectRecord {
                name: "Beta".to_string(),
                registrations: Vec::new(),
            },
            ProjectRecord {
                name: "Gamma".to_string(),
                registrations: vec!["Support".to_string()],
            },
        ]
    }

    #[test]
    fn delimited_output_streams_and_drops_empty_projects() {
        let mut buf = Vec::new();
        let mut writer = DiscoveryWriter::new(&mut buf, DiscoveryFormat::Delimited).unwrap();
        for record in sample_projects() {
            writer.write_record(&record).unwrap();
        }
        assert_eq!(writer.rows_written(), 2);
        let written = writer.finish().unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Project;Registrations\nAlpha;Development|Review\nGamma;Support\n"
        );
    }

    #[test]
    fn json_output_keeps_empty_projects() {
        let mut buf = Vec::new();
        let mut writer = DiscoveryWriter::new(&mut buf, DiscoveryFormat::Json).unwrap();
        for record in sample_projects() {
            writer.write_record(&record).unwrap();
        }
        let written = writer.finish().unwrap();
        assert_eq!(written, 3);

        let parsed: Vec<ProjectRecord> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, sample_projects());
        assert_eq!(parsed[1].registrations.len(), 0);
    }

    #[test]
    fn json_field_names_are_stable() {
        let record = ProjectRecord {
            name: "Alpha".to_string(),
            registrations: vec!["Development".to_string()],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"project": "Alpha", "registrations": ["Development"]})
        );
    }

    #[test]
    fn delimited_round_trip_preserves_names_and_order() {
        let mut buf = Vec::new();
        let mut writer = DiscoveryWriter::new(&mut buf, DiscoveryFormat::Delimited).unwrap();
        for record in sample_projects() {
            writer.write_record(&record).unwrap();
        }
        writer.finish().unwrap();

        let text = String::from_utf8(buf).unwrap();
        let parsed = parse_discovery(&text).unwrap();
        let names: Vec<&str> = parsed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
        assert_eq!(
            parsed[0].registrations,
            vec!["Development".to_string(), "Review".to_string()]
        );
    }

    #[test]
    fn reserved_delimiter_in_name_is_an_error_not_corruption() {
        let mut buf = Vec::new();
        let mut writer = DiscoveryWriter::new(&mut buf, DiscoveryFormat::Delimited).unwrap();
        let err = writer
            .write_record(&ProjectRecord {
                name: "Alpha|Beta".to_string(),
                registrations: vec!["Development".to_string()],
            })
            .unwrap_err();
        assert!(matches!(err, Error::TranscriptFormat { .. }));
    }
}
