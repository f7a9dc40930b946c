// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replays a recorded stream of backend events through a job service.
//
// The input is JSON lines, one `BackendEvent` per line.  Blank lines and
// lines starting with `#` are skipped.  Refresh requests the model raises are
// logged as the outbound backend calls a live host would make.

use std::path::Path;

use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use spoolview_core::config::ModelConfig;
use spoolview_core::error::{Result, SpoolviewError};
use spoolview_core::events::{BackendEvent, Notification};
use spoolview_core::role::{JobFields, Role, RoleValue};
use spoolview_model::{JobFilter, JobService};

/// What a replay run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub jobs: usize,
    pub refresh_requests: usize,
    /// Row count per named view, in creation order.
    pub views: Vec<(String, usize)>,
}

/// Decode a JSON-lines event log.
pub fn parse_events(input: &str) -> Result<Vec<BackendEvent>> {
    let mut events = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line)
            .map_err(|e| SpoolviewError::InvalidEvent(format!("line {}: {e}", index + 1)))?;
        events.push(event);
    }
    Ok(events)
}

/// Replay the event log at `path` and report the resulting views.
pub async fn run(path: &Path, config: ModelConfig) -> Result<ReplaySummary> {
    let input = std::fs::read_to_string(path)?;
    let events = parse_events(&input)?;
    info!(path = %path.display(), events = events.len(), "replaying backend events");

    let window = config.rate_limit_window();
    let handle = JobService::spawn(config)?;
    let mut notifications = handle.subscribe();

    let mut views = Vec::new();
    for (name, filter) in [
        ("all", JobFilter::All),
        ("active", JobFilter::Active),
        ("queued", JobFilter::Queued),
        ("paused", JobFilter::Paused),
    ] {
        views.push((name, handle.create_view(filter).await?));
    }

    let mut summary = ReplaySummary {
        events: events.len(),
        ..Default::default()
    };
    for event in events {
        handle.send(event).await?;
    }

    // Let owed trailing refreshes fire before reading the result.
    handle.count().await?;
    tokio::time::sleep(window + window / 2).await;
    summary.jobs = handle.count().await?;

    loop {
        match notifications.try_recv() {
            Ok(Notification::ForceJobRefresh {
                printer_name,
                job_id,
            }) => {
                summary.refresh_requests += 1;
                info!(printer = %printer_name, job_id, "backend refresh requested");
            }
            Ok(Notification::PrinterStatusChanged {
                printer_name,
                status,
            }) => {
                info!(
                    printer = %printer_name,
                    state = ?status.state,
                    accepting = status.accepting_jobs,
                    "printer status changed"
                );
            }
            Ok(_) => {}
            Err(TryRecvError::Lagged(missed)) => {
                warn!(missed, "notification backlog overflowed");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    for (name, view) in views {
        let rows = handle.view_rows(view).await?.unwrap_or_default();
        for fields in &rows {
            info!(view = name, job = %describe(fields), "row");
        }
        summary.views.push((name.to_string(), rows.len()));
    }

    handle.shutdown().await?;
    Ok(summary)
}

fn describe(fields: &JobFields) -> String {
    let text = |role| match fields.get(&role) {
        Some(RoleValue::Text(s)) => s.clone(),
        Some(RoleValue::UInt(n)) => n.to_string(),
        Some(RoleValue::State(s)) => s.to_string(),
        _ => String::new(),
    };
    format!(
        "{}-{} [{}] {}",
        text(Role::PrinterName),
        text(Role::Id),
        text(Role::State),
        text(Role::Display)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOG: &str = r#"
# two printers, one job finishes
{"kind":"job_created","printer_name":"p1","job_id":1,"job_state":"pending","job_name":"report.pdf"}
{"kind":"job_created","printer_name":"p1","job_id":2,"job_state":"held"}
{"kind":"job_created","printer_name":"p2","job_id":1,"job_state":"processing"}
{"kind":"job_state_changed","printer_name":"p2","job_id":1,"job_state":"completed"}
{"kind":"printer_modified","printer_name":"p1"}
"#;

    #[test]
    fn parse_skips_comments_and_blanks() {
        let events = parse_events(LOG).expect("parse");
        assert_eq!(events.len(), 5);
        assert_eq!(events[4].printer_name(), "p1");
    }

    #[test]
    fn parse_reports_line_number() {
        let err = parse_events("\n{\"kind\":\"job_created\"}\n").expect_err("bad line");
        match err {
            SpoolviewError::InvalidEvent(msg) => assert!(msg.starts_with("line 2:")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn parse_accepts_ipp_codes_and_rejects_unknown_ones() {
        let events = parse_events(
            r#"{"kind":"job_created","printer_name":"p1","job_id":1,"job_state":4,"job_state_reasons":"job-hold-until-specified"}"#,
        )
        .expect("parse");
        let BackendEvent::JobCreated(e) = &events[0] else {
            panic!("expected job created");
        };
        assert_eq!(e.job_state, spoolview_core::types::JobState::Held);
        assert!(e.job_state_reasons.contains("job-hold-until-specified"));

        let err = parse_events(r#"{"kind":"job_created","printer_name":"p1","job_id":1,"job_state":2}"#)
            .expect_err("unknown state");
        match err {
            SpoolviewError::InvalidEvent(msg) => assert!(msg.contains("unknown job-state 2"), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn replay_builds_views() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(LOG.as_bytes()).expect("write");

        let config = ModelConfig {
            rate_limit_window_ms: 20,
            ..Default::default()
        };
        let summary = run(file.path(), config).await.expect("replay");

        assert_eq!(summary.events, 5);
        assert_eq!(summary.jobs, 3);
        // Leading edge only: p1 has two jobs, a single event opens one window.
        assert_eq!(summary.refresh_requests, 2);
        assert_eq!(
            summary.views,
            vec![
                ("all".to_string(), 3),
                ("active".to_string(), 1),
                ("queued".to_string(), 1),
                ("paused".to_string(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = run(&dir.path().join("absent.jsonl"), ModelConfig::default()).await;
        assert!(matches!(result, Err(SpoolviewError::Io(_))));
    }
}
