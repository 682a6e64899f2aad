//! Core indexing engine - orchestrates range indexing.
//!
//! Given a list of block heights, the engine fans out bounded-parallel
//! fetch tasks, applies per-height bounded retry with backoff, dispatches
//! every fetched block to all configured actions, and drains residual
//! fetch failures pass by pass until none remain.

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{IndexerError, IndexerResult};
use crate::metrics::{
    ProcessingTimer, record_action_error, record_block_indexed, record_fetch_failure,
    record_fetch_retry, record_pass_completed,
};
use crate::ports::{ActionContext, BlockAction, ChainClient};
use crate::retry::{RetryError, RetryPolicy};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the indexing engine.
///
/// Retry tuning is an explicit immutable value here; there is no shared
/// process-wide retry state.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Retry policy applied to every block fetch.
    pub retry: RetryPolicy,
    /// Maximum number of fan-out passes over a shrinking failure set.
    ///
    /// `None` keeps retrying failed heights forever. With a limit, heights
    /// that still fail once it is reached surface as
    /// [`IndexerError::PersistentFailures`].
    pub max_passes: Option<u32>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_passes: Some(10),
        }
    }
}

// =============================================================================
// Indexer
// =============================================================================

/// Main indexing engine.
///
/// # Flow
///
/// 1. Validate configuration (concurrency, configured actions)
/// 2. Prepare every action's schema
/// 3. Fan out bounded-parallel fetch tasks over the heights
/// 4. Retry each fetch within its per-height budget; exhausted heights
///    join the pass's failure set
/// 5. Run every action in registration order against each fetched block
/// 6. Re-run the fan-out over the failure set until it is empty
///
/// Heights complete in no particular order; within one height the actions
/// run in a fixed order. A pass's retry set strictly starts after the
/// pass fully drains.
pub struct Indexer<C: ChainClient> {
    config: IndexerConfig,
    chain: Arc<C>,
    actions: Vec<Arc<dyn BlockAction>>,
}

impl<C: ChainClient + 'static> Indexer<C> {
    pub fn new(config: IndexerConfig, chain: Arc<C>, actions: Vec<Arc<dyn BlockAction>>) -> Self {
        Self {
            config,
            chain,
            actions,
        }
    }

    /// Index every height in `heights`.
    ///
    /// `concurrency` bounds the number of heights in flight at once and is
    /// fixed for the whole invocation, retry passes included. Duplicates
    /// in `heights` are processed independently.
    ///
    /// Transient fetch failures never fail the run by themselves; the call
    /// errors only on configuration problems, schema preparation failures,
    /// cancellation, or a failure set that outlives `max_passes`.
    #[instrument(skip_all, fields(chain_id = %self.chain.chain_id(), blocks = heights.len()))]
    pub async fn run(
        &self,
        heights: Vec<u64>,
        concurrency: usize,
        shutdown: watch::Receiver<bool>,
    ) -> IndexerResult<()> {
        if concurrency < 1 {
            return Err(IndexerError::Config(
                "concurrency must be greater than or equal to 1".into(),
            ));
        }
        if self.actions.is_empty() {
            return Err(IndexerError::Config(
                "no block actions configured, check the actions section of your config".into(),
            ));
        }

        for action in &self.actions {
            debug!(action = action.name(), "Preparing action schema");
            action
                .prepare_schema()
                .await
                .map_err(|source| IndexerError::Schema {
                    action: action.name().to_string(),
                    source,
                })?;
        }

        info!(concurrency, "⛓️  Starting block queries");
        let ctx = ActionContext::new(self.chain.clone(), shutdown.clone());

        // Failed heights drain pass by pass instead of recursing: failure
        // sets can be as large as the original range.
        let mut pending = heights;
        let mut pass: u32 = 0;

        while !pending.is_empty() {
            if let Some(max) = self.config.max_passes
                && pass >= max
            {
                pending.sort_unstable();
                return Err(IndexerError::PersistentFailures {
                    passes: pass,
                    heights: pending,
                });
            }
            pass += 1;

            if pass > 1 {
                info!(pass, failed = pending.len(), "🔄 Retrying failed heights");
            }

            pending = self.run_pass(&ctx, pending, concurrency, &shutdown).await?;
            record_pass_completed();
        }

        info!(passes = pass, "✅ Indexing run complete");
        Ok(())
    }

    /// Run one fan-out/fan-in pass and return the heights whose fetch
    /// budget was exhausted.
    async fn run_pass(
        &self,
        ctx: &ActionContext,
        heights: Vec<u64>,
        concurrency: usize,
        shutdown: &watch::Receiver<bool>,
    ) -> IndexerResult<Vec<u64>> {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let failed_heights = Arc::new(Mutex::new(Vec::new()));
        let mut tasks: JoinSet<IndexerResult<()>> = JoinSet::new();

        for height in heights {
            if *shutdown.borrow() {
                tasks.abort_all();
                return Err(IndexerError::ShutdownRequested);
            }

            // One slot per height in flight, released with the task's
            // permit regardless of outcome.
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| IndexerError::Internal(format!("semaphore closed: {e}")))?;

            let chain = self.chain.clone();
            let actions = self.actions.clone();
            let retry = self.config.retry.clone();
            let failed_heights = failed_heights.clone();
            let ctx = ctx.clone();
            let mut shutdown = shutdown.clone();

            tasks.spawn(async move {
                let _permit = permit;

                let fetched = retry
                    .run(
                        &mut shutdown,
                        || chain.block_at(height),
                        |attempt, err| {
                            record_fetch_retry();
                            info!(height, attempt, error = %err, "Failed to get block");
                        },
                    )
                    .await;

                let block = match fetched {
                    Ok(block) => block,
                    Err(RetryError::Cancelled) => return Err(IndexerError::ShutdownRequested),
                    Err(RetryError::Exhausted(err)) => {
                        record_fetch_failure();
                        warn!(height, error = %err, "Retry budget exhausted, deferring height");
                        // Scoped guard: acquired and released on this one
                        // path only.
                        failed_heights.lock().await.push(height);
                        return Ok(());
                    }
                };

                let _timer = ProcessingTimer::new();
                for action in &actions {
                    if let Err(err) = action.execute(&ctx, &block).await {
                        record_action_error(action.name());
                        warn!(
                            action = action.name(),
                            height = block.height,
                            txs = block.txs.len(),
                            error = %err,
                            "Failed to execute block action properly"
                        );
                    }
                }
                record_block_indexed();
                Ok(())
            });
        }

        // Supervisory drain: wait for every worker, keep the first fatal
        // error and abort the rest.
        let mut fatal: Option<IndexerError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if fatal.is_none() {
                        tasks.abort_all();
                        fatal = Some(err);
                    }
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    if fatal.is_none() {
                        tasks.abort_all();
                        fatal = Some(IndexerError::Internal(format!("block task failed: {err}")));
                    }
                }
            }
        }
        if let Some(err) = fatal {
            return Err(err);
        }

        Ok(std::mem::take(&mut *failed_heights.lock().await))
    }
}

// =============================================================================
// Tests
// =============================================================================
