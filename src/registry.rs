//! Registry of active periodic probes
//!
//! The registry maps probe names to their probe and scheduler. Structural
//! changes (add/remove) take the write lock; listings share the read lock.
//! No lock is ever held across a probe execution.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::{ProbeError, ProbeResult, RegistryError, RegistryResult};
use crate::probes::{Probe, ProbeSource, ProbeSummary};
use crate::scheduler::{SchedulerHandle, SchedulerState};

struct RegisteredProbe {
    probe: Arc<dyn Probe>,
    scheduler: SchedulerHandle,
}

/// Concurrency-safe store of periodic probes and their schedulers
#[derive(Default)]
pub struct Registry {
    checks: RwLock<BTreeMap<String, RegisteredProbe>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes a probe to the one-off or the periodic path
    pub async fn dispatch(&self, probe: Box<dyn Probe>, source: ProbeSource) -> RegistryResult<()> {
        if probe.one_off() {
            self.run_once(probe, source).await
        } else {
            self.add_check(probe, source).await
        }
    }

    /// Validates, initializes and executes a probe once, without registering it
    #[instrument(skip_all, fields(probe = %probe.name()))]
    pub async fn run_once(&self, mut probe: Box<dyn Probe>, source: ProbeSource) -> RegistryResult<()> {
        probe.set_source(source);
        let name = probe.name().to_string();

        probe
            .validate()
            .map_err(|e| RegistryError::probe(&name, e))?;

        info!("executing one-off probe {name}");

        probe
            .initialize()
            .map_err(|e| RegistryError::probe(&name, e))?;
        probe
            .execute()
            .await
            .map_err(|e| RegistryError::probe(&name, e))?;

        info!("one-off probe {name} successfully executed");
        Ok(())
    }

    /// Admits a periodic probe and starts its scheduler
    ///
    /// Returns as soon as the scheduler is started; the first execution
    /// happens one interval later.
    #[instrument(skip_all, fields(probe = %probe.name()))]
    pub async fn add_check(&self, mut probe: Box<dyn Probe>, source: ProbeSource) -> RegistryResult<()> {
        probe.set_source(source);
        let name = probe.name().to_string();

        if probe.one_off() {
            return Err(RegistryError::probe(
                &name,
                ProbeError::validation("one-off probes cannot be scheduled"),
            ));
        }
        probe
            .validate()
            .map_err(|e| RegistryError::probe(&name, e))?;
        probe
            .initialize()
            .map_err(|e| RegistryError::probe(&name, e))?;

        let mut checks = self.checks.write().await;
        if checks.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        let probe: Arc<dyn Probe> = Arc::from(probe);
        let scheduler = SchedulerHandle::spawn(probe.clone());
        checks.insert(name.clone(), RegisteredProbe { probe, scheduler });

        info!("probe {name} added");
        Ok(())
    }

    /// Snapshot of all registered probes, ordered by name
    pub async fn list_checks(&self) -> Vec<ProbeSummary> {
        let checks = self.checks.read().await;
        checks.values().map(|entry| entry.probe.describe()).collect()
    }

    pub async fn get_check(&self, name: &str) -> Option<ProbeSummary> {
        let checks = self.checks.read().await;
        checks.get(name).map(|entry| entry.probe.describe())
    }

    pub async fn scheduler_state(&self, name: &str) -> Option<SchedulerState> {
        let checks = self.checks.read().await;
        checks.get(name).map(|entry| entry.scheduler.state())
    }

    /// Runs a registered probe immediately
    ///
    /// Returns `None` when an execution of that probe is already in flight.
    pub async fn run_check(&self, name: &str) -> RegistryResult<Option<ProbeResult<()>>> {
        let pending = {
            let checks = self.checks.read().await;
            let entry = checks
                .get(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            entry.scheduler.check_now()
        };

        // The scheduler only goes away on removal
        pending
            .await
            .map_err(|_| RegistryError::NotFound(name.to_string()))
    }

    /// Cancels a probe's scheduler and removes it
    ///
    /// Once this returns no new execution of the probe will start. An
    /// execution already in flight completes and logs normally.
    #[instrument(skip(self))]
    pub async fn remove_check(&self, name: &str) -> RegistryResult<()> {
        let mut checks = self.checks.write().await;
        let entry = checks
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        entry.scheduler.cancel().await;
        drop(checks);

        info!("probe {name} removed");
        Ok(())
    }

    /// Cancels every scheduler and empties the registry
    pub async fn shutdown(&self) {
        let mut checks = self.checks.write().await;
        let entries = std::mem::take(&mut *checks);
        debug!("stopping {} probes", entries.len());

        join_all(
            entries
                .into_values()
                .map(|entry| entry.scheduler.cancel()),
        )
        .await;
    }

    pub async fn len(&self) -> usize {
        self.checks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.checks.read().await.is_empty()
    }
}
