//! Wave executor.
//!
//! Applies a plan against the provider: entries within a wave dispatch
//! concurrently under a semaphore, waves run strictly in sequence. A
//! failed entry blocks only its dependents; independent branches keep
//! going. The state store is updated after every successful provider
//! call, never before, so a crash or cancellation leaves completed
//! entries durable.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use stratus_provider::{ApplyRequest, AttributeMap, Provider, ProviderError};
use stratus_spec::{property_hash, scan_references, ReplaceStrategy};
use stratus_state::{StateRecord, StateStore};

use crate::cancel::CancelToken;
use crate::diff::{resolve_properties, ChangeEntry, ChangeOp};
use crate::error::{CoreError, CoreResult};
use crate::plan::Plan;
use crate::report::{EntryOutcome, EntryReport, RunReport};
use crate::retry::RetryPolicy;

/// Output environment shared across waves: logical name -> attributes.
type OutputEnv = Arc<RwLock<HashMap<String, AttributeMap>>>;

/// Tunables for a run.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Concurrent provider calls per wave.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why a provider call gave up.
enum CallFailure {
    Cancelled,
    Provider(ProviderError),
}

/// Applies plans against a provider, recording results in the state
/// store.
#[derive(Clone)]
pub struct Executor {
    provider: Arc<dyn Provider>,
    store: Arc<dyn StateStore>,
    options: ExecutorOptions,
}

impl Executor {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn StateStore>) -> Self {
        Self {
            provider,
            store,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute the plan.
    ///
    /// `env` carries the initial output environment: resolved lookups
    /// plus prior-state outputs. Entries refresh it as they apply, so
    /// later waves resolve against this run's fresh outputs.
    ///
    /// Per-entry failures are reported, not returned; the only `Err`
    /// here is a state-store failure, which aborts the run rather than
    /// risk losing a completed apply.
    pub async fn execute(
        &self,
        manifest: &str,
        plan: Plan,
        env: HashMap<String, AttributeMap>,
        cancel: CancelToken,
    ) -> CoreResult<RunReport> {
        let started_at = Utc::now();
        let total_waves = plan.waves.len();
        info!(
            "Starting run for '{}': {} entries in {} waves",
            manifest,
            plan.entry_count(),
            total_waves
        );

        let env: OutputEnv = Arc::new(RwLock::new(env));
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut failed: HashSet<String> = HashSet::new();
        let mut reports: Vec<EntryReport> = Vec::new();

        for (wave_index, wave) in plan.waves.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Run cancelled; skipping wave {}", wave_index + 1);
                for planned in wave.entries {
                    reports.push(Self::report_for(&planned.change, EntryOutcome::Cancelled, 0));
                }
                continue;
            }

            info!(
                "Wave {}/{}: {} entries",
                wave_index + 1,
                total_waves,
                wave.entries.len()
            );

            let mut wave_reports: Vec<EntryReport> = Vec::new();
            let mut join_set: JoinSet<CoreResult<EntryReport>> = JoinSet::new();

            for planned in wave.entries {
                if let Some(dep) = planned
                    .waits_for
                    .iter()
                    .find(|d| failed.contains(d.as_str()))
                {
                    warn!(
                        "Entry '{}' blocked by failed dependency '{}'",
                        planned.change.name, dep
                    );
                    wave_reports.push(Self::report_for(
                        &planned.change,
                        EntryOutcome::Blocked {
                            dependency: dep.clone(),
                        },
                        0,
                    ));
                    continue;
                }

                let executor = self.clone();
                let env = env.clone();
                let cancel = cancel.clone();
                let semaphore = semaphore.clone();
                join_set.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    executor.execute_entry(planned.change, env, cancel).await
                });
            }

            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok(Ok(report)) => wave_reports.push(report),
                    Ok(Err(e)) => {
                        error!("Run aborted: {}", e);
                        return Err(e);
                    }
                    Err(e) => return Err(CoreError::TaskFailed(e.to_string())),
                }
            }

            wave_reports.sort_by(|a, b| a.name.cmp(&b.name));
            for report in &wave_reports {
                if !report.outcome.is_success() {
                    failed.insert(report.name.clone());
                }
            }
            reports.extend(wave_reports);
        }

        let report = RunReport::from_entries(manifest, started_at, reports);
        info!("Run finished: {:?} ({})", report.status, report.summary());
        Ok(report)
    }

    async fn execute_entry(
        &self,
        entry: ChangeEntry,
        env: OutputEnv,
        cancel: CancelToken,
    ) -> CoreResult<EntryReport> {
        let mut attempts = 0u32;
        debug!("Executing {} for '{}'", entry.op, entry.name);

        let outcome = match entry.op.clone() {
            ChangeOp::Create => self.apply(&entry, None, &env, &cancel, &mut attempts).await?,
            ChangeOp::Update => {
                self.apply(&entry, entry.prior_id.clone(), &env, &cancel, &mut attempts)
                    .await?
            }
            ChangeOp::Replace { strategy } => {
                self.replace(&entry, strategy, &env, &cancel, &mut attempts)
                    .await?
            }
            ChangeOp::Delete => self.delete(&entry, &env, &cancel, &mut attempts).await?,
        };

        Ok(Self::report_for(&entry, outcome, attempts))
    }

    /// Create or in-place update, then commit the state record.
    async fn apply(
        &self,
        entry: &ChangeEntry,
        update_id: Option<String>,
        env: &OutputEnv,
        cancel: &CancelToken,
        attempts: &mut u32,
    ) -> CoreResult<EntryOutcome> {
        let resolved = {
            let env_guard = env.read().await;
            resolve_properties(&entry.properties.clone().unwrap_or_default(), &env_guard)
        };
        if let Some(missing) = scan_references(&resolved).first() {
            return Ok(EntryOutcome::Failed {
                error: format!(
                    "Unresolved reference ${{{}.{}}}",
                    missing.target, missing.attribute
                ),
            });
        }

        let request = match update_id {
            Some(id) => ApplyRequest::update(&entry.kind, &entry.name, id, resolved.clone()),
            None => ApplyRequest::create(&entry.kind, &entry.name, resolved.clone()),
        };

        match self
            .call_with_retry(cancel, attempts, || self.provider.apply(request.clone()))
            .await
        {
            Ok(outputs) => {
                let record = StateRecord::new(&entry.name, &entry.kind, &outputs.id)
                    .with_properties(resolved.clone())
                    .with_property_hash(property_hash(&resolved))
                    .with_outputs(outputs.attributes.clone())
                    .with_dependencies(entry.depends_on.clone());
                self.store.upsert(record).await?;
                env.write().await.insert(entry.name.clone(), outputs.attributes);
                info!("Applied '{}' ({})", entry.name, entry.kind);
                Ok(EntryOutcome::Applied)
            }
            Err(CallFailure::Cancelled) => Ok(EntryOutcome::Cancelled),
            Err(CallFailure::Provider(e)) => {
                error!("Entry '{}' failed: {}", entry.name, e);
                Ok(EntryOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Replacement in strategy order. The whole replacement is one
    /// entry, so dependents wait for both halves.
    async fn replace(
        &self,
        entry: &ChangeEntry,
        strategy: ReplaceStrategy,
        env: &OutputEnv,
        cancel: &CancelToken,
        attempts: &mut u32,
    ) -> CoreResult<EntryOutcome> {
        match strategy {
            ReplaceStrategy::DestroyBeforeCreate => {
                if let Some(old_id) = entry.prior_id.clone() {
                    match self.destroy_call(entry, &old_id, cancel, attempts).await {
                        Ok(()) => {
                            // The old resource is gone; drop the record now so
                            // a failed create does not leave state pointing at
                            // a destroyed identifier.
                            self.store.remove(&entry.name).await?;
                        }
                        Err(CallFailure::Cancelled) => return Ok(EntryOutcome::Cancelled),
                        Err(CallFailure::Provider(e)) => {
                            error!("Replacing '{}': destroy failed: {}", entry.name, e);
                            return Ok(EntryOutcome::Failed {
                                error: e.to_string(),
                            });
                        }
                    }
                }
                self.apply(entry, None, env, cancel, attempts).await
            }
            ReplaceStrategy::CreateBeforeDestroy => {
                // New instance first; the old one is destroyed only
                // after the new one reaches success.
                let outcome = self.apply(entry, None, env, cancel, attempts).await?;
                if !outcome.is_success() {
                    return Ok(outcome);
                }
                if let Some(old_id) = entry.prior_id.clone() {
                    match self.destroy_call(entry, &old_id, cancel, attempts).await {
                        Ok(()) => {}
                        Err(CallFailure::Cancelled) => return Ok(EntryOutcome::Cancelled),
                        Err(CallFailure::Provider(e)) => {
                            error!(
                                "Replacing '{}': new instance is live but destroying '{}' failed: {}",
                                entry.name, old_id, e
                            );
                            return Ok(EntryOutcome::Failed {
                                error: format!("old instance not destroyed: {}", e),
                            });
                        }
                    }
                }
                Ok(EntryOutcome::Applied)
            }
        }
    }

    async fn delete(
        &self,
        entry: &ChangeEntry,
        env: &OutputEnv,
        cancel: &CancelToken,
        attempts: &mut u32,
    ) -> CoreResult<EntryOutcome> {
        let id = match entry.prior_id.clone() {
            Some(id) => id,
            None => {
                return Ok(EntryOutcome::Failed {
                    error: "no recorded identifier to destroy".to_string(),
                })
            }
        };

        match self.destroy_call(entry, &id, cancel, attempts).await {
            Ok(()) => {
                self.store.remove(&entry.name).await?;
                env.write().await.remove(&entry.name);
                info!("Destroyed '{}' ({})", entry.name, entry.kind);
                Ok(EntryOutcome::Destroyed)
            }
            Err(CallFailure::Cancelled) => Ok(EntryOutcome::Cancelled),
            Err(CallFailure::Provider(e)) => {
                error!("Destroy of '{}' failed: {}", entry.name, e);
                Ok(EntryOutcome::Failed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Destroy with retry. A resource the provider no longer knows is
    /// treated as already destroyed.
    async fn destroy_call(
        &self,
        entry: &ChangeEntry,
        id: &str,
        cancel: &CancelToken,
        attempts: &mut u32,
    ) -> Result<(), CallFailure> {
        match self
            .call_with_retry(cancel, attempts, || self.provider.destroy(&entry.kind, id))
            .await
        {
            Ok(()) => Ok(()),
            Err(CallFailure::Provider(ProviderError::NotFound { .. })) => {
                warn!("'{}' ({}) already absent on destroy", entry.name, id);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    /// Run one provider call, retrying transient errors with bounded
    /// exponential backoff. The backoff sleep races the cancel token.
    async fn call_with_retry<T, F, Fut>(
        &self,
        cancel: &CancelToken,
        attempts: &mut u32,
        operation: F,
    ) -> Result<T, CallFailure>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(CallFailure::Cancelled);
            }
            attempt += 1;
            *attempts += 1;

            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && self.options.retry.allows_retry(attempt) => {
                    let delay = self.options.retry.delay_for(attempt);
                    warn!(
                        "Transient provider error (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.options.retry.max_attempts, delay, e
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => return Err(CallFailure::Cancelled),
                    }
                }
                Err(e) => return Err(CallFailure::Provider(e)),
            }
        }
    }

    fn report_for(entry: &ChangeEntry, outcome: EntryOutcome, attempts: u32) -> EntryReport {
        EntryReport {
            name: entry.name.clone(),
            kind: entry.kind.clone(),
            op: entry.op.clone(),
            outcome,
            attempts,
        }
    }
}
