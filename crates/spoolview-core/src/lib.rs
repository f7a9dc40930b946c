// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolview Core: types, roles, events and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod events;
pub mod role;
pub mod types;

pub use config::ModelConfig;
pub use error::SpoolviewError;
pub use events::*;
pub use role::{JobFields, Role, RoleValue};
pub use types::*;
