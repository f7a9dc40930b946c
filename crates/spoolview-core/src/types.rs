// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for tracked print jobs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoolviewError};

/// Identity of a tracked job: the owning printer plus the backend job id.
///
/// Ordering is by printer name, then id, which is also the final sort
/// tiebreak used by job views.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey {
    pub printer_name: String,
    pub id: u32,
}

impl JobKey {
    pub fn new(printer_name: impl Into<String>, id: u32) -> Self {
        Self {
            printer_name: printer_name.into(),
            id,
        }
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.printer_name, self.id)
    }
}

/// Lifecycle states of a backend print job (IPP `job-state`, RFC 8011 §5.3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Held,
    Processing,
    Stopped,
    Canceled,
    Aborted,
    Completed,
}

impl JobState {
    /// Map an IPP `job-state` enum value.
    pub fn from_ipp(value: u32) -> Result<Self> {
        match value {
            3 => Ok(Self::Pending),
            4 => Ok(Self::Held),
            5 => Ok(Self::Processing),
            6 => Ok(Self::Stopped),
            7 => Ok(Self::Canceled),
            8 => Ok(Self::Aborted),
            9 => Ok(Self::Completed),
            other => Err(SpoolviewError::InvalidEvent(format!(
                "unknown job-state {other}"
            ))),
        }
    }

    /// The IPP `job-state` enum value.
    pub fn ipp_value(&self) -> u32 {
        match self {
            Self::Pending => 3,
            Self::Held => 4,
            Self::Processing => 5,
            Self::Stopped => 6,
            Self::Canceled => 7,
            Self::Aborted => 8,
            Self::Completed => 9,
        }
    }

    pub fn category(&self) -> StateCategory {
        StateCategory::of(*self)
    }

    pub fn is_terminal(&self) -> bool {
        self.category() == StateCategory::Terminal
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Held => "held",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
            Self::Canceled => "canceled",
            Self::Aborted => "aborted",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Fixed partition of job states used for filtering and sort priority.
///
/// Declaration order is the sort priority: active jobs first, terminal last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    Active,
    Queued,
    Paused,
    Terminal,
}

impl StateCategory {
    /// The policy table.  Every state belongs to exactly one category.
    pub fn of(state: JobState) -> Self {
        match state {
            JobState::Pending | JobState::Processing => Self::Active,
            JobState::Held => Self::Queued,
            JobState::Stopped => Self::Paused,
            JobState::Canceled | JobState::Aborted | JobState::Completed => Self::Terminal,
        }
    }

    /// All job states in this category.
    pub fn states(&self) -> &'static [JobState] {
        match self {
            Self::Active => &[JobState::Pending, JobState::Processing],
            Self::Queued => &[JobState::Held],
            Self::Paused => &[JobState::Stopped],
            Self::Terminal => &[JobState::Canceled, JobState::Aborted, JobState::Completed],
        }
    }

    pub fn contains(&self, state: JobState) -> bool {
        Self::of(state) == *self
    }
}

/// Printer queue state (IPP `printer-state`, RFC 8011 §5.4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterState {
    #[default]
    Idle,
    Processing,
    Stopped,
}

impl PrinterState {
    /// Map an IPP `printer-state` enum value.
    pub fn from_ipp(value: u32) -> Result<Self> {
        match value {
            3 => Ok(Self::Idle),
            4 => Ok(Self::Processing),
            5 => Ok(Self::Stopped),
            other => Err(SpoolviewError::InvalidEvent(format!(
                "unknown printer-state {other}"
            ))),
        }
    }
}

/// Duplex printing mode as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplexMode {
    #[default]
    Simplex,
    LongEdge,
    ShortEdge,
}

/// Whether a job prints every page or an explicit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintRangeMode {
    #[default]
    AllPages,
    PageRange,
}

/// Split a backend state-reasons string (`"media-empty,door-open"`) into a set.
///
/// The IPP placeholder keyword `none` is dropped.
pub fn parse_state_reasons(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty() && *r != "none")
        .map(str::to_string)
        .collect()
}

/// One tracked print job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub printer_name: String,
    pub id: u32,
    pub title: String,
    pub state: JobState,
    pub state_reasons: BTreeSet<String>,
    pub collate: bool,
    pub color_model: String,
    pub copies: u32,
    pub creation_time: Option<DateTime<Utc>>,
    pub completed_time: Option<DateTime<Utc>>,
    pub processing_time: Option<DateTime<Utc>>,
    pub duplex_mode: DuplexMode,
    pub impressions_completed: u32,
    pub landscape: bool,
    pub print_range: String,
    pub print_range_mode: PrintRangeMode,
    pub quality: String,
    pub reverse: bool,
    /// Document size in bytes.
    pub size: u64,
    pub owner_user: String,
    /// Most recent status text received for this job.
    pub last_state_message: String,
    /// Informational log, oldest first.
    pub messages: Vec<String>,
}

impl Job {
    pub fn new(printer_name: impl Into<String>, id: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            printer_name: printer_name.into(),
            id,
            title: String::new(),
            state: JobState::Pending,
            state_reasons: BTreeSet::new(),
            collate: true,
            color_model: String::new(),
            copies: 1,
            creation_time: Some(created_at),
            completed_time: None,
            processing_time: None,
            duplex_mode: DuplexMode::default(),
            impressions_completed: 0,
            landscape: false,
            print_range: String::new(),
            print_range_mode: PrintRangeMode::default(),
            quality: String::new(),
            reverse: false,
            size: 0,
            owner_user: String::new(),
            last_state_message: String::new(),
            messages: Vec::new(),
        }
    }

    pub fn key(&self) -> JobKey {
        JobKey::new(self.printer_name.clone(), self.id)
    }

    pub fn category(&self) -> StateCategory {
        self.state.category()
    }

    pub fn is_held(&self) -> bool {
        self.state == JobState::Held
    }

    /// Move the job to `state`, stamping the processing and completion
    /// times the first time those milestones are reached.
    pub fn transition(&mut self, state: JobState, at: DateTime<Utc>) {
        self.state = state;
        if state == JobState::Processing && self.processing_time.is_none() {
            self.processing_time = Some(at);
        }
        if state.is_terminal() && self.completed_time.is_none() {
            self.completed_time = Some(at);
        }
    }

    /// Append to the message log, trimming the oldest entries past `limit`.
    pub fn push_message(&mut self, message: impl Into<String>, limit: usize) {
        self.messages.push(message.into());
        if self.messages.len() > limit {
            let excess = self.messages.len() - limit;
            self.messages.drain(..excess);
        }
    }
}
