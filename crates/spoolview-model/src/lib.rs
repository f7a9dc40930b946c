// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolview Model: the print job state aggregator.  Applies backend job and
// printer events to an authoritative job store, keeps filtered and sorted
// views of it in step, and rate limits printer-driven refresh requests.

pub mod model;
pub mod rate_limiter;
pub mod service;
pub mod store;
pub mod view;

pub use model::{JobModel, SubscriptionId};
pub use rate_limiter::RateLimiter;
pub use service::{JobService, JobServiceHandle};
pub use store::{ApplyOutcome, JobStore};
pub use view::{JobFilter, JobView};
