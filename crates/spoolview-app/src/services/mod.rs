// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: configuration lookup and replay of recorded backend events
// through the job service.

pub mod data_dir;
pub mod replay;
