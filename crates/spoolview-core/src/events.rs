// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inbound backend events and outbound model notifications.
//
// Inbound events mirror the spooler's job/printer notification payloads:
// every job event carries the job identity, a printer status snapshot and a
// job snapshot.  Outbound notifications describe the minimal change an
// observer needs to stay in sync with the store and its views.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::role::Role;
use crate::types::{
    DuplexMode, Job, JobKey, JobState, PrintRangeMode, PrinterState, parse_state_reasons,
};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Printer status snapshot attached to every backend event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterStatus {
    #[serde(deserialize_with = "wire::printer_state")]
    pub state: PrinterState,
    #[serde(deserialize_with = "wire::state_reasons")]
    pub state_reasons: BTreeSet<String>,
    pub accepting_jobs: bool,
}

impl Default for PrinterStatus {
    fn default() -> Self {
        Self {
            state: PrinterState::Idle,
            state_reasons: BTreeSet::new(),
            accepting_jobs: true,
        }
    }
}

/// Payload of a job created / state changed / completed notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Human-readable notification text.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub printer_uri: String,
    pub printer_name: String,
    #[serde(default)]
    pub printer: PrinterStatus,
    pub job_id: u32,
    #[serde(deserialize_with = "wire::job_state")]
    pub job_state: JobState,
    #[serde(default, deserialize_with = "wire::state_reasons")]
    pub job_state_reasons: BTreeSet<String>,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub job_impressions_completed: u32,
}

impl JobEvent {
    pub fn key(&self) -> JobKey {
        JobKey::new(self.printer_name.clone(), self.job_id)
    }
}

/// A typed patch for one job field, used by attribute updates for fields the
/// job event payload does not carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum JobAttribute {
    Collate(bool),
    ColorModel(String),
    CompletedTime(DateTime<Utc>),
    Copies(u32),
    CreationTime(DateTime<Utc>),
    Duplex(DuplexMode),
    ImpressionsCompleted(u32),
    Landscape(bool),
    PrintRange(String),
    PrintRangeMode(PrintRangeMode),
    ProcessingTime(DateTime<Utc>),
    Quality(String),
    Reverse(bool),
    Size(u64),
    State(#[serde(deserialize_with = "wire::job_state")] JobState),
    StateReasons(#[serde(deserialize_with = "wire::state_reasons")] BTreeSet<String>),
    Title(String),
    User(String),
}

impl JobAttribute {
    /// The role whose value this patch changes.  State reasons have no role
    /// of their own.
    pub fn role(&self) -> Option<Role> {
        Some(match self {
            Self::Collate(_) => Role::Collate,
            Self::ColorModel(_) => Role::ColorModel,
            Self::CompletedTime(_) => Role::CompletedTime,
            Self::Copies(_) => Role::Copies,
            Self::CreationTime(_) => Role::CreationTime,
            Self::Duplex(_) => Role::Duplex,
            Self::ImpressionsCompleted(_) => Role::ImpressionsCompleted,
            Self::Landscape(_) => Role::Landscape,
            Self::PrintRange(_) => Role::PrintRange,
            Self::PrintRangeMode(_) => Role::PrintRangeMode,
            Self::ProcessingTime(_) => Role::ProcessingTime,
            Self::Quality(_) => Role::Quality,
            Self::Reverse(_) => Role::Reverse,
            Self::Size(_) => Role::Size,
            Self::State(_) => Role::State,
            Self::StateReasons(_) => return None,
            Self::Title(_) => Role::Title,
            Self::User(_) => Role::User,
        })
    }

    /// Write this attribute into `job`.  A state patch goes through
    /// [`Job::transition`] so milestone timestamps are stamped at `at`.
    pub fn apply(&self, job: &mut Job, at: DateTime<Utc>) {
        match self {
            Self::Collate(v) => job.collate = *v,
            Self::ColorModel(v) => job.color_model = v.clone(),
            Self::CompletedTime(v) => job.completed_time = Some(*v),
            Self::Copies(v) => job.copies = *v,
            Self::CreationTime(v) => job.creation_time = Some(*v),
            Self::Duplex(v) => job.duplex_mode = *v,
            Self::ImpressionsCompleted(v) => job.impressions_completed = *v,
            Self::Landscape(v) => job.landscape = *v,
            Self::PrintRange(v) => job.print_range = v.clone(),
            Self::PrintRangeMode(v) => job.print_range_mode = *v,
            Self::ProcessingTime(v) => job.processing_time = Some(*v),
            Self::Quality(v) => job.quality = v.clone(),
            Self::Reverse(v) => job.reverse = *v,
            Self::Size(v) => job.size = *v,
            Self::State(v) => job.transition(*v, at),
            Self::StateReasons(v) => job.state_reasons = v.clone(),
            Self::Title(v) => job.title = v.clone(),
            Self::User(v) => job.owner_user = v.clone(),
        }
    }
}

/// One notification from the print-spooling backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendEvent {
    JobCreated(JobEvent),
    JobStateChanged(JobEvent),
    JobCompleted(JobEvent),
    PrinterModified {
        printer_name: String,
        #[serde(default)]
        status: PrinterStatus,
    },
    AttributeUpdate {
        printer_name: String,
        job_id: u32,
        attributes: Vec<JobAttribute>,
    },
    PrinterDeleted {
        printer_name: String,
    },
}

impl BackendEvent {
    /// The printer this event concerns.
    pub fn printer_name(&self) -> &str {
        match self {
            Self::JobCreated(e) | Self::JobStateChanged(e) | Self::JobCompleted(e) => {
                &e.printer_name
            }
            Self::PrinterModified { printer_name, .. }
            | Self::AttributeUpdate { printer_name, .. }
            | Self::PrinterDeleted { printer_name } => printer_name,
        }
    }
}

/// Backend wire forms.  The spooler reports job and printer states as IPP
/// enum integers and state reasons as one comma-separated string; the
/// symbolic forms written by `Serialize` are accepted as well.
mod wire {
    use super::*;
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coded<T> {
        Ipp(u32),
        Named(T),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reasons {
        Joined(String),
        Listed(BTreeSet<String>),
    }

    pub(super) fn job_state<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<JobState, D::Error> {
        match Coded::deserialize(de)? {
            Coded::Ipp(value) => JobState::from_ipp(value).map_err(D::Error::custom),
            Coded::Named(state) => Ok(state),
        }
    }

    pub(super) fn printer_state<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<PrinterState, D::Error> {
        match Coded::deserialize(de)? {
            Coded::Ipp(value) => PrinterState::from_ipp(value).map_err(D::Error::custom),
            Coded::Named(state) => Ok(state),
        }
    }

    pub(super) fn state_reasons<'de, D: Deserializer<'de>>(
        de: D,
    ) -> std::result::Result<BTreeSet<String>, D::Error> {
        Ok(match Reasons::deserialize(de)? {
            Reasons::Joined(raw) => parse_state_reasons(&raw),
            Reasons::Listed(reasons) => reasons,
        })
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Identifier of a job view within one job model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Row-level change to an ordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", content = "row", rename_all = "snake_case")]
pub enum RowChange {
    RowInserted(usize),
    RowRemoved(usize),
    RowChanged(usize),
    /// The whole collection must be re-read.
    Reset,
    /// New row count.
    CountChanged(usize),
}

/// Everything an observer of the job model can be told.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Change to the full job collection.
    Store { change: RowChange },
    /// Change to one filtered view.
    View { view: ViewId, change: RowChange },
    /// The latest printer snapshot, published when a printer-modified burst
    /// is let through by the rate limiter.
    PrinterStatusChanged {
        printer_name: String,
        status: PrinterStatus,
    },
    /// Ask the backend to re-fetch authoritative state for one job.
    ForceJobRefresh { printer_name: String, job_id: u32 },
}
