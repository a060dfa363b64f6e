//! Canonical client-side task state and the service calls that change it.
//!
//! Every service call runs on a spawned tokio task and reports back over a
//! channel as an [`Outcome`]. Local state only changes in [`Controller::apply`],
//! after the service has answered, so the collection never holds speculative
//! records.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::{ServiceError, TaskService};
use crate::models::{NewTask, Task, TaskColor, TaskFilters, TaskPatch, TaskStatus};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load tasks. Check your connection.";

#[derive(Debug)]
pub enum Outcome {
    Listed {
        seq: u64,
        result: Result<Vec<Task>, ServiceError>,
    },
    Created(Result<Task, ServiceError>),
    Updated {
        ticket: u64,
        id: String,
        result: Result<Task, ServiceError>,
    },
    Deleted {
        id: String,
        result: Result<(), ServiceError>,
    },
}

/// What applying an outcome did, for the caller to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Loaded { count: usize },
    LoadFailed { message: String },
    /// A list response arrived after a newer list request was issued.
    Superseded { seq: u64 },
    Created { id: String },
    CreateFailed { message: String },
    /// `ticket` is the value [`Controller::update`] returned for the request.
    Updated { id: String, ticket: u64 },
    UpdateFailed { id: String, ticket: u64, message: String },
    Deleted { id: String },
    DeleteFailed { id: String, message: String },
}

impl Settled {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Settled::LoadFailed { .. }
                | Settled::CreateFailed { .. }
                | Settled::UpdateFailed { .. }
                | Settled::DeleteFailed { .. }
        )
    }

    /// One-line status text, `None` for outcomes nobody needs to hear about.
    pub fn status_line(&self) -> Option<String> {
        match self {
            Settled::Loaded { .. } | Settled::Superseded { .. } => None,
            Settled::LoadFailed { message } => Some(message.clone()),
            Settled::Created { .. } => Some("Note created".to_string()),
            Settled::CreateFailed { message } => Some(format!("Could not create note: {message}")),
            Settled::Updated { .. } => Some("Note saved".to_string()),
            Settled::UpdateFailed { message, .. } => Some(format!("Could not update note: {message}")),
            Settled::Deleted { .. } => Some("Note deleted".to_string()),
            Settled::DeleteFailed { message, .. } => Some(format!("Could not delete note: {message}")),
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: TaskFilters,
}

/// The favorites/others split shown by the list view.
#[derive(Debug, Default)]
pub struct Partitions<'a> {
    pub favorites: Vec<&'a Task>,
    pub others: Vec<&'a Task>,
}

impl<'a> Partitions<'a> {
    pub fn len(&self) -> usize {
        self.favorites.len() + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display order: favorites first, then the rest.
    pub fn iter(&self) -> impl Iterator<Item = &'a Task> + '_ {
        self.favorites.iter().chain(self.others.iter()).copied()
    }

    pub fn get(&self, index: usize) -> Option<&'a Task> {
        self.iter().nth(index)
    }
}

impl TaskState {
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn prepend(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Replace the record with the same id. Returns false when it is not held locally.
    pub fn merge(&mut self, updated: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Favorites and others, each newest first. Recomputed from `tasks` on every call.
    pub fn partitions(&self) -> Partitions<'_> {
        let (mut favorites, mut others): (Vec<&Task>, Vec<&Task>) = self
            .tasks
            .iter()
            .filter(|t| self.filters.matches_color(t))
            .partition(|t| t.is_favorite);
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        others.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Partitions { favorites, others }
    }
}

pub struct Controller<S> {
    service: Arc<S>,
    state: TaskState,
    outcomes_tx: UnboundedSender<Outcome>,
    outcomes_rx: UnboundedReceiver<Outcome>,
    list_seq: u64,
    tickets: u64,
    in_flight: usize,
}

impl<S: TaskService + 'static> Controller<S> {
    pub fn new(service: Arc<S>) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Controller {
            service,
            state: TaskState::default(),
            outcomes_tx,
            outcomes_rx,
            list_seq: 0,
            tickets: 0,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.state.filters
    }

    pub fn partitions(&self) -> Partitions<'_> {
        self.state.partitions()
    }

    /// Requests that have been issued and not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Refetch the list with the current filters. Earlier list requests still in
    /// flight will be ignored when they land.
    pub fn reload(&mut self) {
        self.list_seq += 1;
        let seq = self.list_seq;
        let filters = self.state.filters.clone();
        self.state.loading = true;
        self.state.error = None;
        log::debug!("loading tasks (request #{seq}, {})", filters.summary());

        self.spawn(move |service| async move {
            let result = service.list(&filters).await;
            Outcome::Listed { seq, result }
        });
    }

    /// Drop all local state and fetch again from scratch.
    pub fn reset(&mut self) {
        self.state.tasks.clear();
        self.reload();
    }

    pub fn set_filters(&mut self, filters: TaskFilters) {
        if filters == self.state.filters {
            return;
        }
        self.state.filters = filters;
        self.reload();
    }

    /// Search input changed; an empty input clears the search filter.
    pub fn set_search(&mut self, input: &str) {
        let mut filters = self.state.filters.clone();
        filters.search = if input.is_empty() { None } else { Some(input.to_string()) };
        self.set_filters(filters);
    }

    /// all → favorites only → non-favorites only → all
    pub fn cycle_favorite_filter(&mut self) {
        let mut filters = self.state.filters.clone();
        filters.is_favorite = match filters.is_favorite {
            None => Some(true),
            Some(true) => Some(false),
            Some(false) => None,
        };
        self.set_filters(filters);
    }

    pub fn cycle_status_filter(&mut self) {
        let mut filters = self.state.filters.clone();
        filters.status = match filters.status {
            None => Some(TaskStatus::Pending),
            Some(TaskStatus::Pending) => Some(TaskStatus::InProgress),
            Some(TaskStatus::InProgress) => Some(TaskStatus::Completed),
            Some(TaskStatus::Completed) => None,
        };
        self.set_filters(filters);
    }

    pub fn cycle_color_filter(&mut self) {
        let mut filters = self.state.filters.clone();
        filters.color = match filters.color {
            None => Some(TaskColor::PALETTE[0]),
            Some(c) if c == TaskColor::PALETTE[TaskColor::PALETTE.len() - 1] => None,
            Some(c) => Some(c.next()),
        };
        self.set_filters(filters);
    }

    pub fn create(&mut self, input: NewTask) {
        log::info!("creating note '{}'", input.title);
        self.spawn(move |service| async move { Outcome::Created(service.create(&input).await) });
    }

    /// Returns the ticket the settled result will carry, or `None` when the
    /// patch is empty and nothing was sent.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Option<u64> {
        if patch.is_empty() {
            return None;
        }
        self.tickets += 1;
        let ticket = self.tickets;
        let id = id.to_string();
        self.spawn(move |service| async move {
            let result = service.update(&id, &patch).await;
            Outcome::Updated { ticket, id, result }
        });
        Some(ticket)
    }

    /// Returns false when the id is not in the local collection.
    pub fn toggle_favorite(&mut self, id: &str) -> bool {
        let Some(task) = self.state.find(id) else {
            return false;
        };
        let patch = TaskPatch::favorite(!task.is_favorite);
        self.update(id, patch).is_some()
    }

    pub fn toggle_complete(&mut self, id: &str) -> bool {
        let Some(task) = self.state.find(id) else {
            return false;
        };
        let patch = TaskPatch::status(task.status.toggled());
        self.update(id, patch).is_some()
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> Option<u64> {
        self.update(id, TaskPatch::status(status))
    }

    pub fn delete(&mut self, id: &str) {
        log::info!("deleting note {id}");
        let id = id.to_string();
        self.spawn(move |service| async move {
            let result = service.delete(&id).await;
            Outcome::Deleted { id, result }
        });
    }

    /// Apply every outcome that has already arrived, without waiting.
    pub fn poll(&mut self) -> Vec<Settled> {
        let mut settled = Vec::new();
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            settled.push(self.apply(outcome));
        }
        settled
    }

    /// Wait for the next outcome and apply it.
    pub async fn settle(&mut self) -> Option<Settled> {
        let outcome = self.outcomes_rx.recv().await?;
        Some(self.apply(outcome))
    }

    pub fn apply(&mut self, outcome: Outcome) -> Settled {
        self.in_flight = self.in_flight.saturating_sub(1);
        match outcome {
            Outcome::Listed { seq, result } => {
                if seq != self.list_seq {
                    log::debug!("dropping list response #{seq}, latest is #{}", self.list_seq);
                    return Settled::Superseded { seq };
                }
                self.state.loading = false;
                match result {
                    Ok(tasks) => {
                        let count = tasks.len();
                        self.state.replace_all(tasks);
                        self.state.error = None;
                        Settled::Loaded { count }
                    }
                    Err(e) => {
                        log::error!("Error loading tasks: {e}");
                        self.state.error = Some(LOAD_FAILED_MESSAGE.to_string());
                        Settled::LoadFailed {
                            message: LOAD_FAILED_MESSAGE.to_string(),
                        }
                    }
                }
            }
            Outcome::Created(Ok(task)) => {
                let id = task.id.clone();
                self.state.prepend(task);
                Settled::Created { id }
            }
            Outcome::Created(Err(e)) => {
                log::error!("Error creating task: {e}");
                Settled::CreateFailed { message: e.to_string() }
            }
            Outcome::Updated { ticket, id, result: Ok(task) } => {
                if !self.state.merge(task) {
                    log::debug!("updated note {id} is no longer in the list");
                }
                Settled::Updated { id, ticket }
            }
            Outcome::Updated { ticket, id, result: Err(e) } => {
                log::error!("Error updating task {id}: {e}");
                Settled::UpdateFailed {
                    id,
                    ticket,
                    message: e.to_string(),
                }
            }
            Outcome::Deleted { id, result: Ok(()) } => {
                self.state.remove(&id);
                Settled::Deleted { id }
            }
            Outcome::Deleted { id, result: Err(e) } => {
                log::error!("Error deleting task {id}: {e}");
                Settled::DeleteFailed {
                    id,
                    message: e.to_string(),
                }
            }
        }
    }

    fn spawn<F, Fut>(&mut self, call: F)
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: std::future::Future<Output = Outcome> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.outcomes_tx.clone();
        let request = call(Arc::clone(&self.service));
        tokio::spawn(async move {
            let _ = tx.send(request.await);
        });
    }
}
