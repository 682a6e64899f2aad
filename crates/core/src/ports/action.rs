//! Port trait for pluggable block actions.
//!
//! This is the main extensibility point for the indexer. Each kind of
//! on-chain activity that needs custom indexing logic implements this
//! trait; the engine runs every configured action against every block.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{ActionResult, IndexerError, IndexerResult};
use crate::ports::chain_client::{ChainClient, RawBlock};

/// Collaborators handed to an action for one indexing run.
///
/// Carries the shared chain client (for tx decoding and result lookups)
/// and the run's cancellation signal. Storage handles are not here:
/// each action owns its own.
#[derive(Clone)]
pub struct ActionContext {
    chain: Arc<dyn ChainClient>,
    shutdown: watch::Receiver<bool>,
}

impl ActionContext {
    pub fn new(chain: Arc<dyn ChainClient>, shutdown: watch::Receiver<bool>) -> Self {
        Self { chain, shutdown }
    }

    /// Shared chain client.
    pub fn chain(&self) -> &dyn ChainClient {
        self.chain.as_ref()
    }

    /// Whether the run has been cancelled.
    ///
    /// Actions iterating many transactions should check this between
    /// units of work and bail out with [`crate::error::ActionError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Trait for pluggable block actions.
///
/// Implement this trait to derive records from every block the indexer
/// fetches. Actions run in registration order against each block, and
/// concurrently across different blocks; implementations must tolerate
/// both.
#[async_trait]
pub trait BlockAction: Send + Sync {
    /// Stable unique name used for configuration lookup and logging.
    ///
    /// Must not be empty.
    fn name(&self) -> &'static str;

    /// Idempotently ensure this action's tables exist.
    ///
    /// Called once before any block is processed. Failure is fatal to
    /// starting a run and is never retried.
    async fn prepare_schema(&self) -> ActionResult<()>;

    /// Derive and persist records from one fetched block.
    ///
    /// A tx that fails to decode or whose result cannot be queried is
    /// skipped, not fatal. A returned error is logged and attributed to
    /// this (action, height) pair by the engine; it never fails the run
    /// and never marks the height for retry.
    async fn execute(&self, ctx: &ActionContext, block: &RawBlock) -> ActionResult<()>;
}

/// Registry mapping configured action names to constructed actions.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn BlockAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action.
    ///
    /// Empty or duplicate names are configuration errors.
    pub fn register(&mut self, action: Arc<dyn BlockAction>) -> IndexerResult<()> {
        let name = action.name();
        if name.is_empty() {
            return Err(IndexerError::Config(
                "block action registered with an empty name".into(),
            ));
        }
        if self.actions.iter().any(|a| a.name() == name) {
            return Err(IndexerError::Config(format!(
                "block action {name} registered twice"
            )));
        }
        self.actions.push(action);
        Ok(())
    }

    /// Look up a registered action by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn BlockAction>> {
        self.actions.iter().find(|a| a.name() == name)
    }

    /// Resolve configured names to actions.
    ///
    /// The returned list follows the order of `names`; it becomes the
    /// order the engine runs actions in for every block. An unknown name
    /// is a configuration error, not an engine error.
    pub fn resolve(&self, names: &[String]) -> IndexerResult<Vec<Arc<dyn BlockAction>>> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let action = self.get(name).ok_or_else(|| {
                IndexerError::Config(format!(
                    "there is no block action configured with the name {name}"
                ))
            })?;
            resolved.push(action.clone());
        }
        Ok(resolved)
    }

    /// Names of all registered actions, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
