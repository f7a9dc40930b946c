// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filtered, sorted projection over a job store.
//
// A view owns only a list of store rows in display order.  It is kept in
// step with the store by feeding it every store row change: a single-row
// change re-evaluates that row alone and moves it with a binary search, so a
// busy job never costs a full re-filter.

use std::cmp::Ordering;

use tracing::debug;

use spoolview_core::events::{RowChange, ViewId};
use spoolview_core::role::{JobFields, Role, RoleValue};
use spoolview_core::types::{Job, StateCategory};

use crate::store::JobStore;

/// Which jobs a view shows.  Exactly one filter is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobFilter {
    #[default]
    All,
    PrinterName(String),
    Active,
    Queued,
    Paused,
}

impl JobFilter {
    pub fn accepts(&self, job: &Job) -> bool {
        match self {
            Self::All => true,
            Self::PrinterName(name) => job.printer_name == *name,
            Self::Active => StateCategory::Active.contains(job.state),
            Self::Queued => StateCategory::Queued.contains(job.state),
            Self::Paused => StateCategory::Paused.contains(job.state),
        }
    }
}

/// Display order for sorted views: state category priority, then creation
/// time (unknown last), then identity.
pub fn compare_jobs(a: &Job, b: &Job) -> Ordering {
    a.category()
        .cmp(&b.category())
        .then_with(|| match (a.creation_time, b.creation_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.printer_name.cmp(&b.printer_name))
        .then_with(|| a.id.cmp(&b.id))
}

/// A read-only filtered and optionally sorted projection of a [`JobStore`].
#[derive(Debug)]
pub struct JobView {
    id: ViewId,
    filter: JobFilter,
    sorted: bool,
    /// Store rows in display order.
    rows: Vec<usize>,
    changes: Vec<RowChange>,
}

impl JobView {
    /// Build a sorted view over the current store contents.  Emits nothing.
    pub fn new(id: ViewId, filter: JobFilter, store: &JobStore) -> Self {
        let mut view = Self {
            id,
            filter,
            sorted: true,
            rows: Vec::new(),
            changes: Vec::new(),
        };
        view.rows = view.derive_rows(store);
        view
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn filter(&self) -> &JobFilter {
        &self.filter
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Store rows in display order.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    // -- Filter / sort control -----------------------------------------------

    /// Replace the active filter.  The previous filter is discarded, so the
    /// result depends only on `filter` and the store.
    pub fn set_filter(&mut self, filter: JobFilter, store: &JobStore) {
        debug!(view = %self.id, ?filter, "filter changed");
        self.filter = filter;
        self.rescan(store);
    }

    pub fn filter_on_printer_name(&mut self, name: impl Into<String>, store: &JobStore) {
        self.set_filter(JobFilter::PrinterName(name.into()), store);
    }

    pub fn filter_on_active(&mut self, store: &JobStore) {
        self.set_filter(JobFilter::Active, store);
    }

    pub fn filter_on_queued(&mut self, store: &JobStore) {
        self.set_filter(JobFilter::Queued, store);
    }

    pub fn filter_on_paused(&mut self, store: &JobStore) {
        self.set_filter(JobFilter::Paused, store);
    }

    pub fn clear_filter(&mut self, store: &JobStore) {
        self.set_filter(JobFilter::All, store);
    }

    /// Turn sorting on or off.  Unsorted views keep store order.
    pub fn set_sort_enabled(&mut self, enabled: bool, store: &JobStore) {
        if self.sorted == enabled {
            return;
        }
        self.sorted = enabled;
        self.rescan(store);
    }

    // -- Row access ----------------------------------------------------------

    pub fn source_row(&self, view_row: usize) -> Option<usize> {
        self.rows.get(view_row).copied()
    }

    pub fn view_row(&self, source_row: usize) -> Option<usize> {
        self.rows.iter().position(|&r| r == source_row)
    }

    /// Every role's value for a view row.  Empty when out of range.
    pub fn get(&self, view_row: usize, store: &JobStore) -> JobFields {
        self.source_row(view_row)
            .map(|row| store.get(row))
            .unwrap_or_default()
    }

    pub fn data(&self, view_row: usize, role: Role, store: &JobStore) -> RoleValue {
        self.source_row(view_row)
            .map(|row| store.data(row, role))
            .unwrap_or_default()
    }

    // -- Store tracking ------------------------------------------------------

    /// Bring the view in line with one store change.
    pub fn on_store_change(&mut self, change: RowChange, store: &JobStore) {
        match change {
            RowChange::RowInserted(source) => self.source_inserted(source, store),
            RowChange::RowRemoved(source) => self.source_removed(source),
            RowChange::RowChanged(source) => self.source_changed(source, store),
            RowChange::Reset => self.rescan(store),
            // Membership changes already report the view's own count.
            RowChange::CountChanged(_) => {}
        }
    }

    /// Drain the view changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<RowChange> {
        std::mem::take(&mut self.changes)
    }

    /// Full re-derivation of the visible rows from the store.  Incremental
    /// maintenance must always agree with this.
    pub fn derive_rows(&self, store: &JobStore) -> Vec<usize> {
        let mut rows: Vec<usize> = store
            .jobs()
            .iter()
            .enumerate()
            .filter(|(_, job)| self.filter.accepts(job))
            .map(|(row, _)| row)
            .collect();
        if self.sorted {
            rows.sort_by(|&a, &b| self.compare_rows(a, b, store));
        }
        rows
    }

    fn source_inserted(&mut self, source: usize, store: &JobStore) {
        for row in self.rows.iter_mut().filter(|r| **r >= source) {
            *row += 1;
        }
        let Some(job) = store.job(source) else {
            return;
        };
        if self.filter.accepts(job) {
            let pos = self.insertion_point(source, store);
            self.rows.insert(pos, source);
            self.changes.push(RowChange::RowInserted(pos));
            self.changes.push(RowChange::CountChanged(self.rows.len()));
        }
    }

    fn source_removed(&mut self, source: usize) {
        if let Some(pos) = self.view_row(source) {
            self.rows.remove(pos);
            self.changes.push(RowChange::RowRemoved(pos));
            self.changes.push(RowChange::CountChanged(self.rows.len()));
        }
        for row in self.rows.iter_mut().filter(|r| **r > source) {
            *row -= 1;
        }
    }

    fn source_changed(&mut self, source: usize, store: &JobStore) {
        let Some(job) = store.job(source) else {
            return;
        };
        let accepted = self.filter.accepts(job);

        match (self.view_row(source), accepted) {
            (Some(old), true) => {
                self.rows.remove(old);
                let new = self.insertion_point(source, store);
                self.rows.insert(new, source);
                if new == old {
                    self.changes.push(RowChange::RowChanged(old));
                } else {
                    self.changes.push(RowChange::RowRemoved(old));
                    self.changes.push(RowChange::RowInserted(new));
                }
            }
            (Some(old), false) => {
                self.rows.remove(old);
                self.changes.push(RowChange::RowRemoved(old));
                self.changes.push(RowChange::CountChanged(self.rows.len()));
            }
            (None, true) => {
                let new = self.insertion_point(source, store);
                self.rows.insert(new, source);
                self.changes.push(RowChange::RowInserted(new));
                self.changes.push(RowChange::CountChanged(self.rows.len()));
            }
            (None, false) => {}
        }
    }

    fn rescan(&mut self, store: &JobStore) {
        self.rows = self.derive_rows(store);
        self.changes.push(RowChange::Reset);
        self.changes.push(RowChange::CountChanged(self.rows.len()));
    }

    /// Position at which `source` belongs in `rows` (which must not contain it).
    fn insertion_point(&self, source: usize, store: &JobStore) -> usize {
        self.rows
            .partition_point(|&r| self.compare_rows(r, source, store) == Ordering::Less)
    }

    fn compare_rows(&self, a: usize, b: usize, store: &JobStore) -> Ordering {
        if !self.sorted {
            return a.cmp(&b);
        }
        match (store.job(a), store.job(b)) {
            (Some(x), Some(y)) => compare_jobs(x, y),
            _ => a.cmp(&b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use spoolview_core::events::{JobAttribute, JobEvent};
    use spoolview_core::types::JobState;

    fn event(printer: &str, id: u32, state: JobState) -> JobEvent {
        JobEvent {
            text: String::new(),
            printer_uri: String::new(),
            printer_name: printer.into(),
            printer: Default::default(),
            job_id: id,
            job_state: state,
            job_state_reasons: Default::default(),
            job_name: format!("job {id}"),
            job_impressions_completed: 0,
        }
    }

    /// Apply pending store changes to the view, as the model does.
    fn sync(view: &mut JobView, store: &mut JobStore) -> Vec<RowChange> {
        for change in store.take_changes() {
            view.on_store_change(change, store);
        }
        view.take_changes()
    }

    #[test]
    fn active_filter_follows_state() {
        let mut store = JobStore::default();
        let mut view = JobView::new(ViewId(1), JobFilter::Active, &store);

        store.apply_job_created(&event("p1", 1, JobState::Pending), Utc::now());
        assert_eq!(
            sync(&mut view, &mut store),
            vec![RowChange::RowInserted(0), RowChange::CountChanged(1)]
        );

        store.apply_job_state(&event("p1", 1, JobState::Completed), Utc::now());
        let changes = sync(&mut view, &mut store);
        assert_eq!(
            changes,
            vec![RowChange::RowRemoved(0), RowChange::CountChanged(0)]
        );
        assert!(!changes.contains(&RowChange::Reset));
    }

    #[test]
    fn sorted_by_category_then_creation() {
        let mut store = JobStore::default();
        let t0 = Utc::now();
        store.apply_job_created(&event("p1", 1, JobState::Completed), t0);
        store.apply_job_created(&event("p1", 2, JobState::Held), t0);
        store.apply_job_created(&event("p1", 3, JobState::Processing), t0 + Duration::seconds(2));
        store.apply_job_created(&event("p1", 4, JobState::Pending), t0 + Duration::seconds(1));
        store.apply_job_created(&event("p1", 5, JobState::Stopped), t0);

        let view = JobView::new(ViewId(1), JobFilter::All, &store);
        let ids: Vec<u32> = view
            .rows()
            .iter()
            .map(|&r| store.job(r).expect("row").id)
            .collect();
        assert_eq!(ids, vec![4, 3, 2, 5, 1]);
    }

    #[test]
    fn ties_break_on_identity() {
        let mut store = JobStore::default();
        let t0 = Utc::now();
        store.apply_job_created(&event("p2", 1, JobState::Pending), t0);
        store.apply_job_created(&event("p1", 9, JobState::Pending), t0);
        store.apply_job_created(&event("p1", 3, JobState::Pending), t0);

        let view = JobView::new(ViewId(1), JobFilter::All, &store);
        for _ in 0..3 {
            let keys: Vec<_> = view
                .derive_rows(&store)
                .iter()
                .map(|&r| store.job(r).expect("row").key())
                .collect();
            assert_eq!(
                keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                vec!["p1-3", "p1-9", "p2-1"]
            );
        }
    }

    #[test]
    fn last_filter_wins() {
        let mut store = JobStore::default();
        let now = Utc::now();
        store.apply_job_created(&event("p1", 1, JobState::Pending), now);
        store.apply_job_created(&event("p2", 2, JobState::Held), now);
        store.apply_job_created(&event("p2", 3, JobState::Pending), now);

        let mut view = JobView::new(ViewId(1), JobFilter::All, &store);
        view.filter_on_printer_name("p2", &store);
        view.filter_on_active(&store);

        let fresh = JobView::new(ViewId(2), JobFilter::Active, &store);
        assert_eq!(view.rows(), fresh.rows());
        assert_eq!(view.filter(), &JobFilter::Active);
        assert_eq!(view.count(), 2);
    }

    #[test]
    fn moved_row_reports_remove_then_insert() {
        let mut store = JobStore::default();
        let t0 = Utc::now();
        store.apply_job_created(&event("p1", 1, JobState::Held), t0);
        store.apply_job_created(&event("p1", 2, JobState::Pending), t0);
        let mut view = JobView::new(ViewId(1), JobFilter::All, &store);
        store.take_changes();
        // Sorted: job 2 (active), job 1 (queued).

        store.apply_job_state(&event("p1", 1, JobState::Processing), t0);
        let changes = sync(&mut view, &mut store);
        // Same category now, same creation time; identity puts job 1 first.
        assert_eq!(
            changes,
            vec![RowChange::RowRemoved(1), RowChange::RowInserted(0)]
        );
        assert_eq!(view.rows(), &view.derive_rows(&store)[..]);
    }

    #[test]
    fn unchanged_position_reports_row_changed() {
        let mut store = JobStore::default();
        store.apply_job_created(&event("p1", 1, JobState::Pending), Utc::now());
        let mut view = JobView::new(ViewId(1), JobFilter::All, &store);
        store.take_changes();

        store.apply_attribute_update("p1", 1, &[JobAttribute::Copies(2)], Utc::now());
        assert_eq!(sync(&mut view, &mut store), vec![RowChange::RowChanged(0)]);
    }

    #[test]
    fn store_removal_shifts_view_rows() {
        let mut store = JobStore::default();
        let now = Utc::now();
        for id in 1..=3 {
            store.apply_job_created(&event("p1", id, JobState::Pending), now);
        }
        let mut view = JobView::new(ViewId(1), JobFilter::All, &store);
        store.take_changes();

        store.remove_job(&spoolview_core::JobKey::new("p1", 1));
        sync(&mut view, &mut store);
        assert_eq!(view.rows(), &view.derive_rows(&store)[..]);
        assert_eq!(view.count(), 2);
    }

    #[test]
    fn unsorted_keeps_store_order() {
        let mut store = JobStore::default();
        let now = Utc::now();
        store.apply_job_created(&event("p1", 1, JobState::Completed), now);
        store.apply_job_created(&event("p1", 2, JobState::Pending), now);

        let mut view = JobView::new(ViewId(1), JobFilter::All, &store);
        assert_eq!(view.rows(), &[1, 0]);
        view.set_sort_enabled(false, &store);
        assert_eq!(view.rows(), &[0, 1]);
        assert_eq!(
            view.take_changes(),
            vec![RowChange::Reset, RowChange::CountChanged(2)]
        );
    }

    #[test]
    fn view_get_maps_through_to_store() {
        let mut store = JobStore::default();
        let now = Utc::now();
        store.apply_job_created(&event("p1", 1, JobState::Completed), now);
        store.apply_job_created(&event("p1", 2, JobState::Pending), now);

        let view = JobView::new(ViewId(1), JobFilter::All, &store);
        assert_eq!(view.get(0, &store), store.get(1));
        assert_eq!(view.data(1, Role::Id, &store), RoleValue::UInt(1));
        assert!(view.get(2, &store).is_empty());
    }
}
