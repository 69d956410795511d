//! Campus administration console backend.
//!
//! Library crate: the booking approval workflow, the directory store seam
//! and its implementations, and the management API. The binary in
//! `main.rs` wires these to configuration and the CLI.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod notification;
pub mod store;
pub mod workflow;

use notification::webhook::WebhookNotifier;
use store::postgres::PgStore;
use store::DirectoryStore;
use workflow::BookingWorkflow;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    /// Console tables (alerts, users, admins, settings).
    pub db: PgStore,
    /// Bookings and classrooms, as seen by the workflow.
    pub directory: Arc<dyn DirectoryStore>,
    pub workflow: BookingWorkflow,
    pub webhook: WebhookNotifier,
    pub config: config::Config,
}

impl AppState {
    pub fn new(
        db: PgStore,
        directory: Arc<dyn DirectoryStore>,
        webhook: WebhookNotifier,
        config: config::Config,
    ) -> Arc<Self> {
        let workflow = BookingWorkflow::new(directory.clone());
        Arc::new(Self {
            db,
            directory,
            workflow,
            webhook,
            config,
        })
    }
}
