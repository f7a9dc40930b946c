// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async host for the job model.
//
// Backend events may arrive from any task, but the model is owned by a single
// tokio task and mutated strictly one command at a time.  Rate-limiter
// deadlines are awaited in the same `select!` as inbound commands, so a
// trailing refresh runs on the same context as ordinary events and can never
// overtake one.  When the service stops, the model and every owed trailing
// refresh go with it.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use spoolview_core::config::ModelConfig;
use spoolview_core::error::{Result, SpoolviewError};
use spoolview_core::events::{BackendEvent, Notification, ViewId};
use spoolview_core::role::JobFields;

use crate::model::JobModel;
use crate::view::JobFilter;

/// Requests accepted by the service task.
enum Command {
    Event(BackendEvent),
    CreateView {
        filter: JobFilter,
        reply: oneshot::Sender<ViewId>,
    },
    SetFilter {
        view: ViewId,
        filter: JobFilter,
        reply: oneshot::Sender<bool>,
    },
    SetSortEnabled {
        view: ViewId,
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    RemoveView {
        view: ViewId,
        reply: oneshot::Sender<bool>,
    },
    ViewRows {
        view: ViewId,
        reply: oneshot::Sender<Option<Vec<JobFields>>>,
    },
    StoreRows {
        reply: oneshot::Sender<Vec<JobFields>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Spawns the task that owns a [`JobModel`].
pub struct JobService;

impl JobService {
    /// Start the service on the current tokio runtime.
    pub fn spawn(config: ModelConfig) -> Result<JobServiceHandle> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.service_channel_capacity);
        let (notify_tx, _) = broadcast::channel(config.notification_capacity);

        let mut model = JobModel::new(&config);
        let forward = notify_tx.clone();
        model.subscribe(move |n| {
            // No receivers is fine; nobody is listening yet.
            let _ = forward.send(n.clone());
        });

        let task = tokio::spawn(Self::run(model, rx));
        info!(
            window_ms = config.rate_limit_window_ms,
            "job service started"
        );

        Ok(JobServiceHandle {
            tx,
            notifications: notify_tx,
            task: std::sync::Arc::new(std::sync::Mutex::new(Some(task))),
        })
    }

    async fn run(mut model: JobModel, mut rx: mpsc::Receiver<Command>) {
        loop {
            let deadline = model.next_deadline().map(tokio::time::Instant::from_std);
            let sleep_at = deadline.unwrap_or_else(tokio::time::Instant::now);

            tokio::select! {
                biased;

                cmd = rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => Self::dispatch(&mut model, cmd),
                },

                _ = tokio::time::sleep_until(sleep_at), if deadline.is_some() => {
                    model.fire_due(now());
                }
            }
        }

        model.close();
        info!("job service stopped");
    }

    fn dispatch(model: &mut JobModel, cmd: Command) {
        match cmd {
            Command::Event(event) => {
                let outcome = model.handle_event(event, now());
                debug!(?outcome, "backend event applied");
            }
            Command::CreateView { filter, reply } => {
                let _ = reply.send(model.create_view(filter));
            }
            Command::SetFilter {
                view,
                filter,
                reply,
            } => {
                let _ = reply.send(model.set_filter(view, filter));
            }
            Command::SetSortEnabled {
                view,
                enabled,
                reply,
            } => {
                let _ = reply.send(model.set_sort_enabled(view, enabled));
            }
            Command::RemoveView { view, reply } => {
                let _ = reply.send(model.remove_view(view));
            }
            Command::ViewRows { view, reply } => {
                let _ = reply.send(model.view_rows(view));
            }
            Command::StoreRows { reply } => {
                let store = model.store();
                let rows = (0..store.count()).map(|row| store.get(row)).collect();
                let _ = reply.send(rows);
            }
            Command::Count { reply } => {
                let _ = reply.send(model.store().count());
            }
            Command::Shutdown => {}
        }
    }
}

/// The model's clock.  Goes through tokio so paused test time applies.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Cheaply cloneable handle to a running [`JobService`].
#[derive(Clone)]
pub struct JobServiceHandle {
    tx: mpsc::Sender<Command>,
    notifications: broadcast::Sender<Notification>,
    task: std::sync::Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl JobServiceHandle {
    /// Queue a backend event.  Events are applied in the order sent.
    pub async fn send(&self, event: BackendEvent) -> Result<()> {
        self.command(Command::Event(event)).await
    }

    /// Receive every notification emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub async fn create_view(&self, filter: JobFilter) -> Result<ViewId> {
        self.request(|reply| Command::CreateView { filter, reply }).await
    }

    pub async fn set_filter(&self, view: ViewId, filter: JobFilter) -> Result<bool> {
        self.request(|reply| Command::SetFilter {
            view,
            filter,
            reply,
        })
        .await
    }

    pub async fn set_sort_enabled(&self, view: ViewId, enabled: bool) -> Result<bool> {
        self.request(|reply| Command::SetSortEnabled {
            view,
            enabled,
            reply,
        })
        .await
    }

    pub async fn remove_view(&self, view: ViewId) -> Result<bool> {
        self.request(|reply| Command::RemoveView { view, reply }).await
    }

    /// Field maps of a view's rows in display order, `None` for an unknown view.
    pub async fn view_rows(&self, view: ViewId) -> Result<Option<Vec<JobFields>>> {
        self.request(|reply| Command::ViewRows { view, reply }).await
    }

    /// Field maps of every tracked job in store order.
    pub async fn store_rows(&self) -> Result<Vec<JobFields>> {
        self.request(|reply| Command::StoreRows { reply }).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.request(|reply| Command::Count { reply }).await
    }

    /// Stop the service and wait for its task to finish.  Pending trailing
    /// refreshes are discarded.
    pub async fn shutdown(&self) -> Result<()> {
        // Already gone is as good as stopped.
        let _ = self.tx.send(Command::Shutdown).await;
        let task = self
            .task
            .lock()
            .map_err(|_| SpoolviewError::ServiceClosed)?
            .take();
        if let Some(task) = task {
            task.await.map_err(|_| SpoolviewError::ServiceClosed)?;
        }
        Ok(())
    }

    async fn command(&self, cmd: Command) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SpoolviewError::ServiceClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.command(make(reply)).await?;
        rx.await.map_err(|_| SpoolviewError::ServiceClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use spoolview_core::events::{JobEvent, PrinterStatus};
    use spoolview_core::role::{Role, RoleValue};
    use spoolview_core::types::JobState;

    fn created(printer: &str, id: u32, state: JobState) -> BackendEvent {
        BackendEvent::JobCreated(JobEvent {
            text: String::new(),
            printer_uri: String::new(),
            printer_name: printer.into(),
            printer: PrinterStatus::default(),
            job_id: id,
            job_state: state,
            job_state_reasons: Default::default(),
            job_name: format!("job {id}"),
            job_impressions_completed: 0,
        })
    }

    #[tokio::test]
    async fn events_apply_in_order() {
        let handle = JobService::spawn(ModelConfig::default()).expect("spawn");
        let view = handle.create_view(JobFilter::Active).await.expect("view");

        handle.send(created("p1", 1, JobState::Pending)).await.expect("send");
        handle.send(created("p1", 2, JobState::Completed)).await.expect("send");

        assert_eq!(handle.count().await.expect("count"), 2);
        let rows = handle.view_rows(view).await.expect("rows").expect("view");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][&Role::Id], RoleValue::UInt(1));

        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn trailing_refresh_runs_on_service_task() {
        let handle = JobService::spawn(ModelConfig::default()).expect("spawn");
        let mut rx = handle.subscribe();

        handle.send(created("p1", 1, JobState::Processing)).await.expect("send");
        for _ in 0..3 {
            handle
                .send(BackendEvent::PrinterModified {
                    printer_name: "p1".into(),
                    status: PrinterStatus::default(),
                })
                .await
                .expect("send");
        }
        handle.count().await.expect("sync");
        tokio::time::sleep(Duration::from_millis(600)).await;
        handle.count().await.expect("sync");

        let mut refreshes = 0;
        while let Ok(n) = rx.try_recv() {
            if matches!(n, Notification::ForceJobRefresh { .. }) {
                refreshes += 1;
            }
        }
        assert_eq!(refreshes, 2);
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn closed_service_reports_error() {
        let handle = JobService::spawn(ModelConfig::default()).expect("spawn");
        handle.shutdown().await.expect("shutdown");
        assert!(matches!(
            handle.count().await,
            Err(SpoolviewError::ServiceClosed)
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = ModelConfig {
            service_channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            JobService::spawn(config),
            Err(SpoolviewError::Config(_))
        ));
    }
}
