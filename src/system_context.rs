//! # System Context
//!
//! Shared dependencies for one review process: configuration, store, cache,
//! message channel and the user directory. Services are cheap handles built
//! from the context on demand.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{CacheBackend, CacheProvider, ReviewCache};
use crate::config::ConfigManager;
use crate::database::{DatabaseMigrations, PgReviewStore, ReviewStore};
use crate::error::ReviewResult;
use crate::messaging::{self, CopyJobQueue};
use crate::orchestration::{CopyDispatcher, ReplicationOrchestrator, StaleCopyReaper};
use crate::review::{ReviewDetailService, ReviewGateway};
use crate::services::{
    CacheMonitor, EntityLookup, QueueMonitor, ReviewerDirectory, StatisticsService,
    TaskQueryService, TaskSubmissionService,
};
use crate::worker::{CopyJobConsumer, CopyWorker};

/// Shared system dependencies and configuration
#[derive(Clone)]
pub struct SystemContext {
    /// System instance ID
    pub system_id: Uuid,
    pub config_manager: Arc<ConfigManager>,
    pub store: Arc<dyn ReviewStore>,
    pub messaging: Arc<dyn CopyJobQueue>,
    pub cache: ReviewCache,
    pub directory: Arc<dyn ReviewerDirectory>,
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("system_id", &self.system_id)
            .field("messaging", &self.messaging.backend_name())
            .field("cache", &self.cache.provider().backend_name())
            .finish_non_exhaustive()
    }
}

/// Component health for readiness checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SystemHealth {
    pub store: bool,
    pub messaging: bool,
    /// Cache failures degrade to misses, so this never fails readiness
    pub cache: bool,
}

impl SystemHealth {
    pub fn is_ready(&self) -> bool {
        self.store && self.messaging
    }
}

impl SystemContext {
    /// Connect every backend named by the configuration.
    ///
    /// Postgres and the message channel are required. The cache falls back to
    /// the disabled backend when its own is unreachable.
    pub async fn from_config(
        config_manager: Arc<ConfigManager>,
        directory: Arc<dyn ReviewerDirectory>,
    ) -> ReviewResult<Self> {
        let config = config_manager.config();
        info!(
            environment = %config_manager.environment(),
            "🔧 Building review system context"
        );

        let store = PgReviewStore::connect(&config.database).await?;
        if config.database.run_migrations {
            let applied = DatabaseMigrations::run_all(store.pool()).await?;
            info!(applied = applied, "🗄️ Database migrations complete");
        }

        let provider = CacheProvider::from_config_graceful(&config.cache).await;
        let cache = ReviewCache::new(Arc::new(provider), &config.cache);
        let messaging = messaging::connect(&config.messaging).await?;

        Ok(Self::with_components(
            config_manager,
            Arc::new(store),
            messaging,
            cache,
            directory,
        ))
    }

    /// Assemble a context from already-built components
    pub fn with_components(
        config_manager: Arc<ConfigManager>,
        store: Arc<dyn ReviewStore>,
        messaging: Arc<dyn CopyJobQueue>,
        cache: ReviewCache,
        directory: Arc<dyn ReviewerDirectory>,
    ) -> Self {
        Self {
            system_id: Uuid::new_v4(),
            config_manager,
            store,
            messaging,
            cache,
            directory,
        }
    }

    pub fn entity_lookup(&self) -> EntityLookup {
        EntityLookup::new(self.store.clone(), self.cache.clone())
    }

    pub fn copy_worker(&self) -> CopyWorker {
        CopyWorker::new(self.store.clone())
    }

    pub fn copy_dispatcher(&self) -> CopyDispatcher {
        let config = self.config_manager.config();
        CopyDispatcher::new(
            config.replication.dispatch_mode,
            self.messaging.clone(),
            config.messaging.copy_queue.clone(),
            self.copy_worker(),
        )
    }

    pub fn replication_orchestrator(&self) -> ReplicationOrchestrator {
        ReplicationOrchestrator::new(
            self.store.clone(),
            self.entity_lookup(),
            self.cache.clone(),
            self.copy_dispatcher(),
        )
    }

    pub fn review_gateway(&self) -> ReviewGateway {
        ReviewGateway::new(self.store.clone(), self.entity_lookup(), self.cache.clone())
    }

    pub fn review_detail(&self) -> ReviewDetailService {
        ReviewDetailService::new(
            self.store.clone(),
            self.entity_lookup(),
            self.directory.clone(),
        )
    }

    pub fn task_query(&self) -> TaskQueryService {
        TaskQueryService::new(self.store.clone(), self.directory.clone())
    }

    pub fn task_submission(&self) -> TaskSubmissionService {
        TaskSubmissionService::new(
            self.store.clone(),
            self.directory.clone(),
            self.cache.clone(),
        )
    }

    pub fn statistics(&self) -> StatisticsService {
        StatisticsService::new(
            self.store.clone(),
            self.directory.clone(),
            self.cache.clone(),
        )
    }

    pub fn queue_monitor(&self) -> QueueMonitor {
        QueueMonitor::new(self.messaging.clone(), &self.config_manager.config().messaging)
    }

    pub fn cache_monitor(&self) -> CacheMonitor {
        CacheMonitor::new(self.cache.clone())
    }

    pub fn copy_job_consumer(&self) -> CopyJobConsumer {
        let config = self.config_manager.config();
        CopyJobConsumer::new(
            self.messaging.clone(),
            self.copy_worker(),
            config.messaging.copy_queue.clone(),
            config.worker.clone(),
        )
    }

    pub fn stale_copy_reaper(&self) -> StaleCopyReaper {
        let replication = &self.config_manager.config().replication;
        StaleCopyReaper::new(
            self.store.clone(),
            replication.stale_copy_timeout(),
            replication.reaper_interval(),
        )
    }

    pub async fn health_check(&self) -> SystemHealth {
        let store = match self.store.health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                false
            }
        };
        let messaging = self.messaging.is_healthy().await;
        if !messaging {
            warn!(backend = self.messaging.backend_name(), "Copy job queue is unhealthy");
        }
        let cache = self.cache.provider().ping().await.unwrap_or(false);

        SystemHealth {
            store,
            messaging,
            cache,
        }
    }
}
