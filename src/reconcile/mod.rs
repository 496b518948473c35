//! Reconciliation of check outcomes against the status page.
//!
//! For each outcome the group is resolved, the component is found or
//! created, and the incident for the day is created, updated or skipped.
//! A batch runs one task per target, a target being a component name within
//! its resolved group. Outcomes for the same target run in input order inside
//! that task; tasks share nothing but the read-only configuration.

mod clock;
mod component;
mod grouping;
mod incident;

pub use clock::*;
pub use component::*;
pub use grouping::*;
pub use incident::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::client::{ClientError, StatusPageApi};
use crate::config::IntegrationConfig;
use crate::models::{CheckOutcome, ComponentDraft, Iteration, ValidationError};

/// Reconciliation error types.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("status page rejected {operation} for {name}")]
    Rejected { operation: &'static str, name: String },
    #[error("deadline exceeded before reconciliation finished")]
    DeadlineExceeded,
    #[error("reconciliation task failed: {0}")]
    Join(String),
}

/// A batch aborted in strict mode.
#[derive(Error, Debug)]
#[error("reconciling {name} failed: {source}")]
pub struct IterationError {
    pub name: String,
    #[source]
    pub source: ReconcileError,
}

/// Flags shared by every unit of a batch. All default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Ask the status page to notify subscribers about incident writes.
    pub notify: bool,
    /// Report a valid outcome even if the component never had an incident.
    pub save_valid_incidents: bool,
    /// Write components and incidents even when their status is unchanged.
    pub update_if_statuses_are_the_same: bool,
}

/// Result of reconciling one outcome.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub component: ResolvedComponent,
    pub incident: IncidentAction,
}

/// Per-outcome entry of an [`IterationReport`].
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident: Option<IncidentAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitReport {
    pub fn completed(name: String, outcome: UnitOutcome) -> Self {
        Self {
            name,
            component_id: Some(outcome.component.component.id),
            component: Some(outcome.component.action),
            incident: Some(outcome.incident),
            error: None,
        }
    }

    pub fn failed(name: String, error: &ReconcileError) -> Self {
        Self {
            name,
            component_id: None,
            component: None,
            incident: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a whole batch, one entry per check outcome in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IterationReport {
    pub ordinal: i64,
    pub units: Vec<UnitReport>,
}

impl IterationReport {
    pub fn is_success(&self) -> bool {
        self.units.iter().all(UnitReport::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| !u.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.units.iter().filter(|u| u.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.units.len() - self.succeeded()
    }
}

/// The reconciliation engine. Cheap to clone.
#[derive(Clone)]
pub struct Reconciler {
    config: Arc<IntegrationConfig>,
}

impl Reconciler {
    pub fn new(config: IntegrationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// The remote client, for administrative calls outside reconciliation.
    pub fn client(&self) -> &dyn StatusPageApi {
        self.config.client.as_ref()
    }

    /// Reconcile a single check outcome: component first, then incident.
    pub async fn reconcile_check_result(
        &self,
        outcome: &CheckOutcome,
        options: &ReconcileOptions,
    ) -> Result<UnitOutcome, ReconcileError> {
        let group_id = self.config.grouping.resolve(outcome.group.as_deref());
        let draft = ComponentDraft::new(outcome.name.clone(), outcome.component_status())
            .with_group(group_id);

        let component = ComponentResolver::new(self.client())
            .resolve(&draft, options.update_if_statuses_are_the_same)
            .await?;

        let incident = IncidentReconciler::new(self.client(), self.config.clock.as_ref())
            .reconcile(component.component.id, outcome, options)
            .await?;

        Ok(UnitOutcome {
            component,
            incident,
        })
    }

    /// Reconcile every outcome of a batch concurrently.
    ///
    /// Distinct targets run in parallel. Outcomes naming the same component
    /// in the same group run one after another in input order, so the second
    /// sees what the first wrote.
    ///
    /// In lenient mode a failing unit is recorded in the report and its
    /// siblings carry on. In strict mode the first failure aborts the
    /// remaining units and is returned as the error. `deadline` bounds the
    /// whole batch; units still running when it expires fail with
    /// [`ReconcileError::DeadlineExceeded`].
    pub async fn reconcile_iteration(
        &self,
        iteration: &Iteration,
        options: ReconcileOptions,
        deadline: Option<Duration>,
    ) -> Result<IterationReport, IterationError> {
        let fail_fast = self.config.connection.fail_fast;
        let deadline = deadline.map(|d| Instant::now() + d);

        tracing::info!(
            "Reconciling iteration {} with {} results",
            iteration.ordinal,
            iteration.results.len()
        );

        let mut targets: Vec<Vec<(usize, CheckOutcome)>> = Vec::new();
        let mut target_of: HashMap<(String, i64), usize> = HashMap::new();
        for (index, outcome) in iteration.results.iter().cloned().enumerate() {
            let group_id = self.config.grouping.resolve(outcome.group.as_deref());
            let slot = *target_of
                .entry((outcome.name.clone(), group_id))
                .or_insert_with(|| {
                    targets.push(Vec::new());
                    targets.len() - 1
                });
            targets[slot].push((index, outcome));
        }

        let mut tasks = JoinSet::new();
        let mut task_units: HashMap<_, Vec<usize>> = HashMap::new();

        for target in targets {
            let this = self.clone();
            let indexes = target.iter().map(|(index, _)| *index).collect();
            let handle = tasks.spawn(async move {
                let mut results = Vec::with_capacity(target.len());
                for (index, outcome) in target {
                    let unit = this.reconcile_check_result(&outcome, &options);
                    let result = match deadline {
                        Some(at) => timeout_at(at, unit)
                            .await
                            .unwrap_or(Err(ReconcileError::DeadlineExceeded)),
                        None => unit.await,
                    };
                    let failed = result.is_err();
                    results.push((index, outcome.name, result));
                    if failed && fail_fast {
                        break;
                    }
                }
                results
            });
            task_units.insert(handle.id(), indexes);
        }

        let mut units: Vec<Option<UnitReport>> = vec![None; iteration.results.len()];

        while let Some(joined) = tasks.join_next_with_id().await {
            let results = match joined {
                Ok((_, results)) => results,
                Err(e) => {
                    let message = e.to_string();
                    task_units[&e.id()]
                        .iter()
                        .map(|&index| {
                            let name = iteration.results[index].name.clone();
                            (index, name, Err(ReconcileError::Join(message.clone())))
                        })
                        .collect()
                }
            };

            for (index, name, result) in results {
                match result {
                    Ok(outcome) => units[index] = Some(UnitReport::completed(name, outcome)),
                    Err(error) => {
                        tracing::error!("Failed to reconcile {}: {}", name, error);
                        if fail_fast {
                            tasks.abort_all();
                            return Err(IterationError {
                                name,
                                source: error,
                            });
                        }
                        units[index] = Some(UnitReport::failed(name, &error));
                    }
                }
            }
        }

        let report = IterationReport {
            ordinal: iteration.ordinal,
            units: units.into_iter().flatten().collect(),
        };

        if report.is_success() {
            tracing::info!(
                "Iteration {} reconciled: {} results",
                report.ordinal,
                report.succeeded()
            );
        } else {
            tracing::warn!(
                "Iteration {} reconciled with failures: {} of {} results failed",
                report.ordinal,
                report.failed(),
                report.units.len()
            );
        }

        Ok(report)
    }
}
