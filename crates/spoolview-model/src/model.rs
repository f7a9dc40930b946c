// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The job model: one store, its views, the printer-modified rate limiter and
// the listeners that observe them.
//
// Everything here runs on a single logical context.  A mutation is applied to
// the store, the store's row changes are fed to every view, and the combined
// notifications are handed to listeners before the call returns, so a reader
// never observes a view that lags the store.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use spoolview_core::config::ModelConfig;
use spoolview_core::events::{BackendEvent, JobEvent, Notification, PrinterStatus, ViewId};
use spoolview_core::role::JobFields;
use spoolview_core::types::JobKey;

use crate::rate_limiter::RateLimiter;
use crate::store::{ApplyOutcome, JobStore};
use crate::view::{JobFilter, JobView};

/// Callback invoked synchronously with every notification.
pub type Listener = Box<dyn FnMut(&Notification) + Send>;

/// Handle returned by [`JobModel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct JobModel {
    store: JobStore,
    views: BTreeMap<ViewId, JobView>,
    limiter: RateLimiter<String, PrinterStatus>,
    printers: HashMap<String, PrinterStatus>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_view: u64,
    next_subscription: u64,
}

impl JobModel {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            store: JobStore::new(config.message_log_limit),
            views: BTreeMap::new(),
            limiter: RateLimiter::new(config.rate_limit_window()),
            printers: HashMap::new(),
            listeners: Vec::new(),
            next_view: 1,
            next_subscription: 1,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Latest status snapshot seen for a printer.
    pub fn printer_status(&self, printer_name: &str) -> Option<&PrinterStatus> {
        self.printers.get(printer_name)
    }

    // -- Inbound -------------------------------------------------------------

    /// Apply one backend event.  Trailing rate-limiter fires that fell due
    /// before `now` are delivered first so they stay ordered with events.
    pub fn handle_event(&mut self, event: BackendEvent, now: Instant) -> ApplyOutcome {
        self.fire_due(now);
        match event {
            BackendEvent::JobCreated(e) => self.job_created(&e),
            BackendEvent::JobStateChanged(e) => self.job_state(&e),
            BackendEvent::JobCompleted(e) => self.job_completed(&e),
            BackendEvent::PrinterModified {
                printer_name,
                status,
            } => self.printer_modified(&printer_name, status, now),
            BackendEvent::AttributeUpdate {
                printer_name,
                job_id,
                attributes,
            } => {
                let outcome = self
                    .store
                    .apply_attribute_update(&printer_name, job_id, &attributes, Utc::now());
                self.flush();
                outcome
            }
            BackendEvent::PrinterDeleted { printer_name } => self.printer_deleted(&printer_name),
        }
    }

    pub fn job_created(&mut self, event: &JobEvent) -> ApplyOutcome {
        self.record_printer(event);
        let outcome = self.store.apply_job_created(event, Utc::now());
        self.flush();
        outcome
    }

    pub fn job_state(&mut self, event: &JobEvent) -> ApplyOutcome {
        self.record_printer(event);
        let outcome = self.store.apply_job_state(event, Utc::now());
        self.flush();
        outcome
    }

    pub fn job_completed(&mut self, event: &JobEvent) -> ApplyOutcome {
        self.record_printer(event);
        let outcome = self.store.apply_job_completed(event, Utc::now());
        self.flush();
        outcome
    }

    /// A printer's attributes changed upstream.  Refreshes of that printer's
    /// jobs are rate limited per printer.
    pub fn printer_modified(
        &mut self,
        printer_name: &str,
        status: PrinterStatus,
        now: Instant,
    ) -> ApplyOutcome {
        self.fire_due(now);
        self.printers
            .insert(printer_name.to_string(), status.clone());
        if self
            .limiter
            .should_emit_now(&printer_name.to_string(), status.clone(), now)
        {
            self.refresh_printer(printer_name, status);
            ApplyOutcome::Refreshed
        } else {
            ApplyOutcome::Throttled
        }
    }

    /// The printer is gone: forget it and every job it owned.
    pub fn printer_deleted(&mut self, printer_name: &str) -> ApplyOutcome {
        self.printers.remove(printer_name);
        self.limiter.cancel(&printer_name.to_string());
        let removed = self.store.remove_printer_jobs(printer_name);
        self.flush();
        info!(printer = printer_name, removed, "printer deleted");
        ApplyOutcome::Removed(removed)
    }

    pub fn reassign_printer(&mut self, key: &JobKey, new_printer: &str) -> ApplyOutcome {
        let outcome = self.store.reassign_printer(key, new_printer);
        self.flush();
        outcome
    }

    pub fn remove_job(&mut self, key: &JobKey) -> ApplyOutcome {
        let outcome = self.store.remove_job(key);
        self.flush();
        outcome
    }

    // -- Rate limiter timing -------------------------------------------------

    /// When the owner must next call [`fire_due`](Self::fire_due).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.limiter.next_deadline()
    }

    /// Deliver trailing printer refreshes whose window has closed.
    pub fn fire_due(&mut self, now: Instant) {
        for (printer_name, status) in self.limiter.take_due(now) {
            debug!(printer = %printer_name, "trailing printer refresh");
            self.refresh_printer(&printer_name, status);
        }
    }

    fn refresh_printer(&mut self, printer_name: &str, status: PrinterStatus) {
        let keys = self.store.keys_for_printer(printer_name);
        debug!(printer = printer_name, jobs = keys.len(), "requesting job refresh");

        let mut batch = Vec::with_capacity(keys.len() + 1);
        batch.push(Notification::PrinterStatusChanged {
            printer_name: printer_name.to_string(),
            status,
        });
        batch.extend(keys.into_iter().map(|key| Notification::ForceJobRefresh {
            printer_name: key.printer_name,
            job_id: key.id,
        }));
        self.emit(batch);
    }

    // -- Views ---------------------------------------------------------------

    pub fn create_view(&mut self, filter: JobFilter) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        self.views.insert(id, JobView::new(id, filter, &self.store));
        debug!(view = %id, "view created");
        id
    }

    pub fn view(&self, id: ViewId) -> Option<&JobView> {
        self.views.get(&id)
    }

    /// Stop maintaining a view.  No further notifications name it.
    pub fn remove_view(&mut self, id: ViewId) -> bool {
        self.views.remove(&id).is_some()
    }

    pub fn set_filter(&mut self, id: ViewId, filter: JobFilter) -> bool {
        let Some(view) = self.views.get_mut(&id) else {
            warn!(view = %id, "filter change for unknown view");
            return false;
        };
        view.set_filter(filter, &self.store);
        let changes = view.take_changes();
        self.emit(
            changes
                .into_iter()
                .map(|change| Notification::View { view: id, change })
                .collect(),
        );
        true
    }

    pub fn set_sort_enabled(&mut self, id: ViewId, enabled: bool) -> bool {
        let Some(view) = self.views.get_mut(&id) else {
            warn!(view = %id, "sort change for unknown view");
            return false;
        };
        view.set_sort_enabled(enabled, &self.store);
        let changes = view.take_changes();
        self.emit(
            changes
                .into_iter()
                .map(|change| Notification::View { view: id, change })
                .collect(),
        );
        true
    }

    /// Field map of a view row.  Empty for an unknown view or row.
    pub fn view_get(&self, id: ViewId, row: usize) -> JobFields {
        self.views
            .get(&id)
            .map(|view| view.get(row, &self.store))
            .unwrap_or_default()
    }

    /// Field maps of every row of a view, in display order.
    pub fn view_rows(&self, id: ViewId) -> Option<Vec<JobFields>> {
        let view = self.views.get(&id)?;
        Some(
            view.rows()
                .iter()
                .map(|&row| self.store.get(row))
                .collect(),
        )
    }

    // -- Listeners -----------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&Notification) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    /// Tear down: drop owed trailing fires, views and listeners.
    pub fn close(&mut self) {
        self.limiter.clear();
        self.views.clear();
        self.listeners.clear();
        debug!("job model closed");
    }

    // -- Internals -----------------------------------------------------------

    fn record_printer(&mut self, event: &JobEvent) {
        self.printers
            .insert(event.printer_name.clone(), event.printer.clone());
    }

    /// Forward pending store changes to every view and then to listeners.
    fn flush(&mut self) {
        let mut batch = Vec::new();
        for change in self.store.take_changes() {
            batch.push(Notification::Store { change });
            for (id, view) in self.views.iter_mut() {
                view.on_store_change(change, &self.store);
                batch.extend(
                    view.take_changes()
                        .into_iter()
                        .map(|change| Notification::View { view: *id, change }),
                );
            }
        }
        self.emit(batch);
    }

    fn emit(&mut self, batch: Vec<Notification>) {
        for notification in &batch {
            for (_, listener) in self.listeners.iter_mut() {
                listener(notification);
            }
        }
    }
}
