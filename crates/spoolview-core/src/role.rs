// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Role-keyed field access.
//
// A `Role` names one job attribute.  Observers bind to roles by numeric code
// or by name, so both are a published contract: never renumber or rename an
// existing role, only append.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DuplexMode, Job, JobState, PrintRangeMode};

/// Closed set of job fields an observer can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum Role {
    /// Display text for the row; carries the job title.
    Display = 0,
    Id = 256,
    Collate,
    ColorModel,
    CompletedTime,
    Copies,
    CreationTime,
    Duplex,
    Held,
    ImpressionsCompleted,
    Landscape,
    Messages,
    PrinterName,
    PrintRange,
    PrintRangeMode,
    ProcessingTime,
    Quality,
    Reverse,
    Size,
    State,
    Title,
    User,
    LastStateMessage,
}

impl Role {
    pub const ALL: [Role; 23] = [
        Role::Display,
        Role::Id,
        Role::Collate,
        Role::ColorModel,
        Role::CompletedTime,
        Role::Copies,
        Role::CreationTime,
        Role::Duplex,
        Role::Held,
        Role::ImpressionsCompleted,
        Role::Landscape,
        Role::Messages,
        Role::PrinterName,
        Role::PrintRange,
        Role::PrintRangeMode,
        Role::ProcessingTime,
        Role::Quality,
        Role::Reverse,
        Role::Size,
        Role::State,
        Role::Title,
        Role::User,
        Role::LastStateMessage,
    ];

    /// Stable numeric code.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }

    /// Stable binding name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Display => "displayName",
            Self::Id => "id",
            Self::Collate => "collate",
            Self::ColorModel => "colorModel",
            Self::CompletedTime => "completedTime",
            Self::Copies => "copies",
            Self::CreationTime => "creationTime",
            Self::Duplex => "duplexMode",
            Self::Held => "held",
            Self::ImpressionsCompleted => "impressionsCompleted",
            Self::Landscape => "landscape",
            Self::Messages => "messages",
            Self::PrinterName => "printerName",
            Self::PrintRange => "printRange",
            Self::PrintRangeMode => "printRangeMode",
            Self::ProcessingTime => "processingTime",
            Self::Quality => "quality",
            Self::Reverse => "reverse",
            Self::Size => "size",
            Self::State => "state",
            Self::Title => "title",
            Self::User => "user",
            Self::LastStateMessage => "lastStateMessage",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.name() == name)
    }
}

/// A typed field value.  `Empty` stands for "no data": an unset timestamp,
/// or any lookup against a row that does not exist.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RoleValue {
    #[default]
    Empty,
    Bool(bool),
    UInt(u64),
    Text(String),
    TextList(Vec<String>),
    Time(DateTime<Utc>),
    State(JobState),
    Duplex(DuplexMode),
    RangeMode(PrintRangeMode),
}

impl RoleValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn from_time(t: Option<DateTime<Utc>>) -> Self {
        t.map(Self::Time).unwrap_or(Self::Empty)
    }
}

/// Every role's value for one row.  Empty when the row does not exist.
pub type JobFields = BTreeMap<Role, RoleValue>;

impl Job {
    /// Value of a single role for this job.
    pub fn value(&self, role: Role) -> RoleValue {
        match role {
            Role::Display | Role::Title => RoleValue::Text(self.title.clone()),
            Role::Id => RoleValue::UInt(u64::from(self.id)),
            Role::Collate => RoleValue::Bool(self.collate),
            Role::ColorModel => RoleValue::Text(self.color_model.clone()),
            Role::CompletedTime => RoleValue::from_time(self.completed_time),
            Role::Copies => RoleValue::UInt(u64::from(self.copies)),
            Role::CreationTime => RoleValue::from_time(self.creation_time),
            Role::Duplex => RoleValue::Duplex(self.duplex_mode),
            Role::Held => RoleValue::Bool(self.is_held()),
            Role::ImpressionsCompleted => RoleValue::UInt(u64::from(self.impressions_completed)),
            Role::Landscape => RoleValue::Bool(self.landscape),
            Role::Messages => RoleValue::TextList(self.messages.clone()),
            Role::PrinterName => RoleValue::Text(self.printer_name.clone()),
            Role::PrintRange => RoleValue::Text(self.print_range.clone()),
            Role::PrintRangeMode => RoleValue::RangeMode(self.print_range_mode),
            Role::ProcessingTime => RoleValue::from_time(self.processing_time),
            Role::Quality => RoleValue::Text(self.quality.clone()),
            Role::Reverse => RoleValue::Bool(self.reverse),
            Role::Size => RoleValue::UInt(self.size),
            Role::State => RoleValue::State(self.state),
            Role::User => RoleValue::Text(self.owner_user.clone()),
            Role::LastStateMessage => RoleValue::Text(self.last_state_message.clone()),
        }
    }

    /// Values of every role for this job.
    pub fn fields(&self) -> JobFields {
        Role::ALL.iter().map(|&r| (r, self.value(r))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Role::Display.code(), 0);
        assert_eq!(Role::Id.code(), 256);
        assert_eq!(Role::Collate.code(), 257);
        assert_eq!(Role::State.code(), 274);
        assert_eq!(Role::LastStateMessage.code(), 277);
    }

    #[test]
    fn names_and_codes_resolve_back() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.name()), Some(role));
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
        assert_eq!(Role::from_name("nope"), None);
        assert_eq!(Role::from_code(1), None);
    }

    #[test]
    fn fields_cover_every_role() {
        let job = Job::new("p1", 7, Utc::now());
        let fields = job.fields();
        assert_eq!(fields.len(), Role::ALL.len());
        assert_eq!(fields[&Role::Id], RoleValue::UInt(7));
        assert_eq!(fields[&Role::PrinterName], RoleValue::Text("p1".into()));
        assert!(fields[&Role::CompletedTime].is_empty());
    }

    #[test]
    fn held_role_tracks_state() {
        let mut job = Job::new("p1", 1, Utc::now());
        assert_eq!(job.value(Role::Held), RoleValue::Bool(false));
        job.state = JobState::Held;
        assert_eq!(job.value(Role::Held), RoleValue::Bool(true));
    }
}
