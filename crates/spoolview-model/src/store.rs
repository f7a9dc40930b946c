// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Authoritative in-memory job collection.
//
// The store keeps jobs in insertion order with an auxiliary index from
// (printer name, job id) to row.  Every mutation records the minimal row
// change it caused; the owner drains those with `take_changes` and forwards
// them to views and listeners.  Events for jobs the store has never seen are
// dropped with a warning, never an error.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use spoolview_core::events::{JobAttribute, JobEvent, RowChange};
use spoolview_core::role::{JobFields, Role, RoleValue};
use spoolview_core::types::{Job, JobKey};

/// What applying one backend event did.  The store produces the row-level
/// outcomes; `Refreshed` and `Throttled` come from the printer-modified path
/// of [`JobModel`](crate::model::JobModel), which reports through the same
/// type so `handle_event` has a single return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new row was appended at this index.
    Inserted(usize),
    /// The row at this index was changed in place.
    Updated(usize),
    /// Rows were removed (count given).
    Removed(usize),
    /// No job with the requested identity is tracked.
    Missed,
    /// The change would have given two jobs the same identity.
    Conflict,
    /// A printer refresh was let through immediately.
    Refreshed,
    /// A printer refresh was absorbed into a pending trailing refresh.
    Throttled,
}

/// Ordered, deduplicated collection of tracked jobs.
pub struct JobStore {
    jobs: Vec<Job>,
    index: HashMap<JobKey, usize>,
    message_log_limit: usize,
    changes: Vec<RowChange>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl JobStore {
    pub fn new(message_log_limit: usize) -> Self {
        Self {
            jobs: Vec::new(),
            index: HashMap::new(),
            message_log_limit,
            changes: Vec::new(),
        }
    }

    // -- Inbound events ------------------------------------------------------

    /// Track a newly created job.  A repeat for an already-tracked identity
    /// is handled as a state change.
    #[instrument(skip_all, fields(printer = %event.printer_name, job_id = event.job_id))]
    pub fn apply_job_created(&mut self, event: &JobEvent, now: DateTime<Utc>) -> ApplyOutcome {
        if self.index.contains_key(&event.key()) {
            debug!("job already tracked, treating creation as state change");
            return self.apply_job_state(event, now);
        }

        let mut job = Job::new(event.printer_name.clone(), event.job_id, now);
        job.title = event.job_name.clone();
        job.transition(event.job_state, now);
        job.state_reasons = event.job_state_reasons.clone();
        job.impressions_completed = event.job_impressions_completed;
        job.last_state_message = event.text.clone();
        job.push_message(derived_message(event), self.message_log_limit);

        let row = self.jobs.len();
        self.index.insert(job.key(), row);
        self.jobs.push(job);

        self.changes.push(RowChange::RowInserted(row));
        self.changes.push(RowChange::CountChanged(self.jobs.len()));
        debug!(row, count = self.jobs.len(), "job inserted");
        ApplyOutcome::Inserted(row)
    }

    /// Apply a job state change notification.
    #[instrument(skip_all, fields(printer = %event.printer_name, job_id = event.job_id))]
    pub fn apply_job_state(&mut self, event: &JobEvent, now: DateTime<Utc>) -> ApplyOutcome {
        let Some(row) = self.row_of(&event.key()) else {
            warn!(state = %event.job_state, "state change for untracked job dropped");
            return ApplyOutcome::Missed;
        };

        let limit = self.message_log_limit;
        let job = &mut self.jobs[row];
        job.transition(event.job_state, now);
        job.state_reasons = event.job_state_reasons.clone();
        job.impressions_completed = event.job_impressions_completed;
        if !event.job_name.is_empty() {
            job.title = event.job_name.clone();
        }
        job.last_state_message = event.text.clone();
        job.push_message(derived_message(event), limit);

        self.changes.push(RowChange::RowChanged(row));
        debug!(row, state = %event.job_state, "job state updated");
        ApplyOutcome::Updated(row)
    }

    /// Apply a job completed notification.  Stamps the completion time even
    /// when the reported state is not itself terminal.
    pub fn apply_job_completed(&mut self, event: &JobEvent, now: DateTime<Utc>) -> ApplyOutcome {
        let outcome = self.apply_job_state(event, now);
        if let ApplyOutcome::Updated(row) = outcome {
            let job = &mut self.jobs[row];
            if job.completed_time.is_none() {
                job.completed_time = Some(now);
            }
        }
        outcome
    }

    /// Patch individual fields of a tracked job.  A state patch stamps
    /// milestone times at `now` like a state event does.
    #[instrument(skip(self, attributes, now), fields(count = attributes.len()))]
    pub fn apply_attribute_update(
        &mut self,
        printer_name: &str,
        id: u32,
        attributes: &[JobAttribute],
        now: DateTime<Utc>,
    ) -> ApplyOutcome {
        let Some(row) = self.row_of(&JobKey::new(printer_name, id)) else {
            warn!("attribute update for untracked job dropped");
            return ApplyOutcome::Missed;
        };

        let job = &mut self.jobs[row];
        for attribute in attributes {
            attribute.apply(job, now);
        }

        self.changes.push(RowChange::RowChanged(row));
        let roles: Vec<&str> = attributes
            .iter()
            .filter_map(JobAttribute::role)
            .map(|role| role.name())
            .collect();
        debug!(row, ?roles, "job attributes updated");
        ApplyOutcome::Updated(row)
    }

    /// Move a tracked job to another printer, e.g. after the printer was
    /// renamed upstream.
    #[instrument(skip(self), fields(job = %key))]
    pub fn reassign_printer(&mut self, key: &JobKey, new_printer: &str) -> ApplyOutcome {
        let Some(row) = self.row_of(key) else {
            warn!("reassignment of untracked job dropped");
            return ApplyOutcome::Missed;
        };

        let new_key = JobKey::new(new_printer, key.id);
        if new_key == *key {
            return ApplyOutcome::Updated(row);
        }
        if self.index.contains_key(&new_key) {
            warn!(target_printer = new_printer, "reassignment would duplicate a job identity");
            return ApplyOutcome::Conflict;
        }

        self.index.remove(key);
        self.index.insert(new_key, row);
        self.jobs[row].printer_name = new_printer.to_string();

        self.changes.push(RowChange::RowChanged(row));
        debug!(row, printer = new_printer, "job reassigned");
        ApplyOutcome::Updated(row)
    }

    // -- Explicit removal ----------------------------------------------------

    /// Stop tracking one job.
    #[instrument(skip(self), fields(job = %key))]
    pub fn remove_job(&mut self, key: &JobKey) -> ApplyOutcome {
        let Some(row) = self.row_of(key) else {
            warn!("removal of untracked job dropped");
            return ApplyOutcome::Missed;
        };

        self.jobs.remove(row);
        self.reindex();

        self.changes.push(RowChange::RowRemoved(row));
        self.changes.push(RowChange::CountChanged(self.jobs.len()));
        debug!(row, count = self.jobs.len(), "job removed");
        ApplyOutcome::Removed(1)
    }

    /// Stop tracking every job of a printer, e.g. when the printer is
    /// deleted.  Returns the number of jobs removed.
    #[instrument(skip(self))]
    pub fn remove_printer_jobs(&mut self, printer_name: &str) -> usize {
        let first = self.jobs.iter().position(|j| j.printer_name == printer_name);
        let before = self.jobs.len();
        self.jobs.retain(|j| j.printer_name != printer_name);
        let removed = before - self.jobs.len();

        match (removed, first) {
            (0, _) | (_, None) => return 0,
            (1, Some(row)) => self.changes.push(RowChange::RowRemoved(row)),
            _ => self.changes.push(RowChange::Reset),
        }
        self.reindex();
        self.changes.push(RowChange::CountChanged(self.jobs.len()));
        debug!(removed, count = self.jobs.len(), "printer jobs removed");
        removed
    }

    // -- Queries -------------------------------------------------------------

    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// All jobs in row order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, row: usize) -> Option<&Job> {
        self.jobs.get(row)
    }

    /// Exact lookup by identity.
    pub fn find(&self, printer_name: &str, id: u32) -> Option<&Job> {
        self.row_of(&JobKey::new(printer_name, id))
            .and_then(|row| self.jobs.get(row))
    }

    pub fn row_of(&self, key: &JobKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Every role's value for a row.  Empty for a row that does not exist.
    pub fn get(&self, row: usize) -> JobFields {
        self.jobs.get(row).map(Job::fields).unwrap_or_default()
    }

    /// One role's value for a row.  `Empty` for a row that does not exist.
    pub fn data(&self, row: usize, role: Role) -> RoleValue {
        self.jobs
            .get(row)
            .map(|job| job.value(role))
            .unwrap_or_default()
    }

    /// Identities of every job tracked under a printer, in row order.
    pub fn keys_for_printer(&self, printer_name: &str) -> Vec<JobKey> {
        self.jobs
            .iter()
            .filter(|j| j.printer_name == printer_name)
            .map(Job::key)
            .collect()
    }

    /// Drain the row changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<RowChange> {
        std::mem::take(&mut self.changes)
    }

    fn reindex(&mut self) {
        self.index = self
            .jobs
            .iter()
            .enumerate()
            .map(|(row, job)| (job.key(), row))
            .collect();
    }
}

/// Message logged for a job event: the backend's text, or a state summary
/// when the backend sent none.
fn derived_message(event: &JobEvent) -> String {
    if event.text.is_empty() {
        format!("Job {} is {}", event.job_id, event.job_state)
    } else {
        event.text.clone()
    }
}
