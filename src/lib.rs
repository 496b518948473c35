//! statusward - keeps a Cachet status page in line with health checks.
//!
//! Check outcomes are reconciled into components and daily incidents on the
//! status page. See [`reconcile::Reconciler`] for the entry point.

pub mod client;
pub mod config;
pub mod models;
pub mod reconcile;
pub mod web;

pub use client::{CachetClient, ClientError, StatusPageApi};
pub use config::{ConfigError, Credentials, IntegrationConfig, IntegrationConfigBuilder, ServerConfig};
pub use models::{CheckOutcome, Iteration};
pub use reconcile::{
    Clock, IterationError, IterationReport, LocalClock, ReconcileError, ReconcileOptions, Reconciler,
    SystemClock,
};
