//! Reconciler
//!
//! Periodic control loop that turns pending status reports into a change proposal against
//! the registry document. Each tick:
//!
//! 1. returns immediately when the store is clean (no remote calls),
//! 2. fetches the registry document from the base branch,
//! 3. merges every pending report into it and serializes the result,
//! 4. skips publishing while a proposal for the branch is already open (store stays dirty),
//! 5. creates a branch, commits the document and opens a proposal,
//! 6. marks the store flushed.
//!
//! Any failure aborts the tick with the store still dirty; the next tick retries.

use crate::config::CollectorConfig;
use crate::error::{ReconcileError, RemoteError};
use crate::registry::RegistryFile;
use crate::remote::{ProposalId, RemoteRepository};
use crate::store::StatusStore;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where and how proposals are published
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub registry_path: String,
    pub base_branch: String,
    pub interval: Duration,
    pub branch_prefix: String,
    pub commit_message: String,
    pub proposal_title: String,
    pub proposal_body: String,
}

impl ReconcilerSettings {
    pub fn new(registry_path: impl Into<String>, base_branch: impl Into<String>) -> Self {
        let defaults = crate::config::ReconcilerConfig::default();
        Self {
            registry_path: registry_path.into(),
            base_branch: base_branch.into(),
            interval: defaults.interval(),
            branch_prefix: defaults.branch_prefix,
            commit_message: defaults.commit_message,
            proposal_title: defaults.proposal_title,
            proposal_body: defaults.proposal_body,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn from_config(config: &CollectorConfig) -> Self {
        Self {
            registry_path: config.registry.file_path.clone(),
            base_branch: config.registry.base_branch.clone(),
            interval: config.reconciler.interval(),
            branch_prefix: config.reconciler.branch_prefix.clone(),
            commit_message: config.reconciler.commit_message.clone(),
            proposal_title: config.reconciler.proposal_title.clone(),
            proposal_body: config.reconciler.proposal_body.clone(),
        }
    }

    /// Proposal branch for a tick started at `now`
    pub fn branch_name_at(&self, now: DateTime<Utc>) -> String {
        format!("{}-{}", self.branch_prefix, now.timestamp())
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing pending
    Clean,
    /// A proposal for the branch is already open; nothing written, store left dirty
    AlreadyConverging {
        branch: String,
        open: Vec<ProposalId>,
    },
    /// A new proposal was opened and the store flushed
    Published {
        proposal_id: ProposalId,
        branch: String,
        /// Reports merged into tracked claims
        updated: usize,
        /// Reports for claims the registry does not track
        untracked: usize,
    },
}

pub struct Reconciler {
    store: Arc<StatusStore>,
    remote: Arc<dyn RemoteRepository>,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(
        store: Arc<StatusStore>,
        remote: Arc<dyn RemoteRepository>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            remote,
            settings,
        }
    }

    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Run ticks on a fixed interval until `cancel` fires.
    ///
    /// The first tick happens one full interval after start. A failed tick is logged and
    /// never ends the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.settings.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = period.as_secs_f64(),
            registry_path = %self.settings.registry_path,
            base_branch = %self.settings.base_branch,
            backend = self.remote.backend_name(),
            "Reconciler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.reconcile_once(&cancel).await {
                Ok(outcome) => debug!(?outcome, "Reconcile tick finished"),
                Err(ReconcileError::Cancelled) => break,
                Err(e) => error!(error = %e, operation = e.operation(), "Reconcile tick failed"),
            }
        }

        info!("Reconciler stopped");
    }

    /// Execute one reconciliation tick.
    pub async fn reconcile_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<TickOutcome, ReconcileError> {
        if !self.store.is_dirty() {
            debug!("Store clean, skipping reconcile");
            return Ok(TickOutcome::Clean);
        }
        if cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let snapshot = self.store.snapshot();
        let settings = &self.settings;

        let file = guarded(
            cancel,
            "fetch registry",
            self.remote
                .fetch_file(&settings.registry_path, &settings.base_branch),
        )
        .await?;

        let mut registry = RegistryFile::parse(&file.content)?;

        let mut entries = snapshot.entries;
        entries.sort_by(|a, b| a.key().cmp(&b.key()));
        let checked_at = Utc::now();
        let mut updated = 0;
        let mut untracked = 0;
        for entry in &entries {
            if registry.update_claim_status_at(
                &entry.cluster,
                &entry.claim_ref,
                &entry.status_message,
                checked_at,
            ) {
                updated += 1;
            } else {
                untracked += 1;
                warn!(
                    cluster = %entry.cluster,
                    claim_ref = %entry.claim_ref,
                    "Status reported for a claim the registry does not track, skipping"
                );
            }
        }

        let document = registry.serialize()?;
        let branch = settings.branch_name_at(checked_at);

        let open = guarded(
            cancel,
            "list open PRs",
            self.remote.list_open_proposals(&branch),
        )
        .await?;
        if !open.is_empty() {
            info!(branch = %branch, open = ?open, "Proposal already open, leaving changes pending");
            return Ok(TickOutcome::AlreadyConverging { branch, open });
        }

        let base_commit = guarded(
            cancel,
            "get ref",
            self.remote.resolve_ref(&settings.base_branch),
        )
        .await?;

        guarded(
            cancel,
            "create branch",
            self.remote.create_branch(&base_commit, &branch),
        )
        .await?;

        guarded(
            cancel,
            "update file",
            self.remote.update_file(
                &settings.registry_path,
                &branch,
                &settings.commit_message,
                &document,
                &file.version,
            ),
        )
        .await?;

        let proposal_id = guarded(
            cancel,
            "create PR",
            self.remote.create_change_proposal(
                &settings.proposal_title,
                &settings.proposal_body,
                &branch,
                &settings.base_branch,
            ),
        )
        .await?;

        if !self.store.mark_flushed_if_unchanged(snapshot.generation) {
            info!("New reports arrived during reconcile, keeping store dirty");
        }
        info!(
            proposal_id,
            branch = %branch,
            updated,
            untracked,
            "Opened status update proposal"
        );

        Ok(TickOutcome::Published {
            proposal_id,
            branch,
            updated,
            untracked,
        })
    }
}

/// Race a remote call against cancellation and tag failures with the operation name.
async fn guarded<T>(
    cancel: &CancellationToken,
    operation: &'static str,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, ReconcileError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReconcileError::Cancelled),
        result = call => result.map_err(|e| ReconcileError::remote(operation, e)),
    }
}
