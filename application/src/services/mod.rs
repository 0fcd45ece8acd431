//! Shared orchestration services
//!
//! These hold the mutable state shared between concurrently running turns.
//! [`TurnServices`] bundles them for injection into
//! [`RunTurnUseCase`](crate::use_cases::run_turn::RunTurnUseCase).

pub mod approval_broker;
pub mod checkpoint_manager;
pub mod concurrency_guard;
pub mod routing_cache;

use crate::config::RoutingCacheConfig;
use crate::ports::checkpoint_store::CheckpointStore;
use crate::ports::clock::Clock;
use approval_broker::ApprovalBroker;
use checkpoint_manager::CheckpointManager;
use concurrency_guard::ConcurrencyGuard;
use routing_cache::RoutingCache;
use std::sync::Arc;

/// Services shared by all turns of a process.
#[derive(Clone)]
pub struct TurnServices {
    pub routing_cache: Arc<RoutingCache>,
    pub guard: ConcurrencyGuard,
    pub broker: Arc<ApprovalBroker>,
    pub checkpoints: Arc<CheckpointManager>,
    pub clock: Arc<dyn Clock>,
}

impl TurnServices {
    /// Build all services around one clock.
    pub fn new(
        checkpoint_store: Arc<dyn CheckpointStore>,
        cache_config: &RoutingCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            routing_cache: Arc::new(RoutingCache::new(cache_config, clock.clone())),
            guard: ConcurrencyGuard::new(),
            broker: Arc::new(ApprovalBroker::new(clock.clone())),
            checkpoints: Arc::new(CheckpointManager::new(checkpoint_store, clock.clone())),
            clock,
        }
    }
}
