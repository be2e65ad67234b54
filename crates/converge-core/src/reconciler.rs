//! Reconciler
//!
//! The orchestrating core. One call to [`Reconciler::reconcile`] drives a
//! single run through its phases:
//! 1. Resolve the connection entry
//! 2. Probe whether the environment exists
//! 3. Compute the delta (no writes happen before this completes)
//! 4. Create or update through the engine
//! 5. Report whether anything changed

use crate::connection::connection_entry;
use crate::delta::compute_delta;
use crate::engine::EnvironmentEngine;
use crate::error::{ReconcileError, Result, Stage};
use crate::phase::{Phase, PhaseTracker};
use crate::prober::StateProber;
use crate::types::{ConfigEntry, DesiredParams, DesiredState, ReconciliationResult};
use std::path::Path;

/// Changes a run would make, computed without writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Environment already exists
    pub exists: bool,
    /// Entry always written first
    pub connection: ConfigEntry,
    /// Desired entries that differ from the store
    pub delta: Vec<ConfigEntry>,
}

impl Plan {
    /// Whether applying this plan changes anything
    #[inline]
    #[must_use]
    pub fn would_change(&self) -> bool {
        !self.exists || !self.delta.is_empty()
    }
}

/// Drives project environments to their desired state
///
/// Holds no state between runs; every run probes the engine afresh.
#[derive(Debug)]
pub struct Reconciler<E: EnvironmentEngine> {
    engine: E,
}

impl<E: EnvironmentEngine> Reconciler<E> {
    /// Create reconciler over `engine`
    #[inline]
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Underlying engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Validate raw caller parameters, then reconcile
    ///
    /// Precondition failures are reported before any engine call.
    ///
    /// # Errors
    /// See [`DesiredParams::resolve`] and [`Reconciler::reconcile`]
    pub fn run(&self, params: DesiredParams) -> Result<ReconciliationResult> {
        let desired = params.resolve()?;
        self.reconcile(&desired)
    }

    /// Bring the environment at `desired.path()` into conformance
    ///
    /// # Errors
    /// - `ConfigKeyMissing` if an existing environment has no configuration
    ///   store; nothing is written
    /// - `EngineFailure` for any engine failure; entries already written to an
    ///   existing environment stay written
    pub fn reconcile(&self, desired: &DesiredState) -> Result<ReconciliationResult> {
        let mut phase = PhaseTracker::new();
        tracing::info!(
            project = %desired.name(),
            path = %desired.path().display(),
            backend = %desired.backend(),
            "reconciling project environment"
        );

        let outcome = self.plan_tracked(desired, &mut phase).and_then(|plan| {
            let changed = self.apply(desired.path(), plan.exists, &plan.connection, &plan.delta)?;
            phase.advance(Phase::Applied);
            Ok((plan, changed))
        });

        match outcome {
            Ok((plan, changed)) => {
                phase.advance(Phase::Done);
                tracing::info!(
                    project = %desired.name(),
                    changed,
                    created = !plan.exists,
                    written = plan.delta.len(),
                    "reconciliation complete"
                );
                Ok(ReconciliationResult {
                    changed,
                    identity: desired.identity().clone(),
                    created: !plan.exists,
                    applied: plan.delta,
                })
            }
            Err(e) => {
                tracing::warn!(
                    project = %desired.name(),
                    phase = ?phase.current(),
                    kind = %e.kind(),
                    error = %e,
                    "reconciliation failed"
                );
                phase.advance(Phase::Failed);
                Err(e)
            }
        }
    }

    /// Probe and diff without applying anything
    ///
    /// # Errors
    /// Same as the first half of [`Reconciler::reconcile`]
    pub fn plan(&self, desired: &DesiredState) -> Result<Plan> {
        self.plan_tracked(desired, &mut PhaseTracker::new())
    }

    fn plan_tracked(&self, desired: &DesiredState, phase: &mut PhaseTracker) -> Result<Plan> {
        let connection = connection_entry(desired.backend(), desired.connection())?;

        let prober = StateProber::new(&self.engine);
        let path = desired.path();
        let exists = prober.exists(path)?;
        phase.advance(Phase::Probed);
        tracing::debug!(path = %path.display(), exists, "probed environment");

        let delta = compute_delta(desired.config(), exists, |section, option| {
            prober.current_value(path, section, option)
        })?;
        phase.advance(Phase::DeltaComputed);

        Ok(Plan {
            exists,
            connection,
            delta,
        })
    }

    /// Execute the write path matching `exists`
    ///
    /// A missing environment is created with `[connection] ++ delta` and
    /// always counts as a change. An existing one gets the connection entry
    /// and then each delta entry, persisted once at the end; only a non-empty
    /// delta counts as a change.
    ///
    /// # Errors
    /// `EngineFailure` on any engine failure
    pub fn apply(
        &self,
        path: &Path,
        exists: bool,
        connection: &ConfigEntry,
        delta: &[ConfigEntry],
    ) -> Result<bool> {
        if exists {
            self.update(path, connection, delta)?;
            Ok(!delta.is_empty())
        } else {
            self.create(path, connection, delta)?;
            Ok(true)
        }
    }

    fn create(&self, path: &Path, connection: &ConfigEntry, delta: &[ConfigEntry]) -> Result<()> {
        let mut options = Vec::with_capacity(delta.len() + 1);
        options.push(connection.clone());
        options.extend_from_slice(delta);

        tracing::debug!(path = %path.display(), options = options.len(), "creating environment");
        let handle = self
            .engine
            .create(path, &options)
            .map_err(|e| ReconcileError::engine(Stage::Create, e))?;
        self.engine
            .shutdown(handle)
            .map_err(|e| ReconcileError::engine(Stage::Shutdown, e))
    }

    fn update(&self, path: &Path, connection: &ConfigEntry, delta: &[ConfigEntry]) -> Result<()> {
        let update_err = |e| ReconcileError::engine(Stage::Update, e);

        let mut handle = self.engine.open(path).map_err(update_err)?;
        let written = std::iter::once(connection)
            .chain(delta)
            .try_for_each(|entry| {
                // values stay out of the log; the connection url holds the password
                tracing::debug!(section = %entry.section, option = %entry.option, "writing entry");
                self.engine.set_config_value(&mut handle, entry)
            })
            .and_then(|()| self.engine.save(&mut handle));

        // release the handle even when a write failed; the write error wins
        let released = self.engine.shutdown(handle);
        written.map_err(update_err)?;
        released.map_err(|e| ReconcileError::engine(Stage::Shutdown, e))
    }
}
