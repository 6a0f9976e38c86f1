//! ABOUTME: Connection pool construction and migration runner

use crate::config::PostgresConfig;
use deadpool_postgres::{Config as DeadpoolConfig, Pool, Runtime};
use quillforge_core::error::{PipelineError, Result};
use tokio_postgres::NoTls;
use tracing::info;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Build a connection pool and apply any pending migrations (§6.2).
pub async fn connect(config: &PostgresConfig) -> Result<Pool> {
    let mut deadpool_config = DeadpoolConfig::new();
    deadpool_config.url = Some(config.connection_string.clone());
    deadpool_config.pool = Some(deadpool_postgres::PoolConfig::new(config.max_pool_size));

    let pool = deadpool_config
        .create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| PipelineError::Storage {
            message: format!("failed to build connection pool: {e}"),
            source: Some(Box::new(e)),
        })?;

    {
        let mut client = pool.get().await.map_err(|e| PipelineError::Storage {
            message: format!("failed to acquire connection for migrations: {e}"),
            source: Some(Box::new(e)),
        })?;
        let report = embedded::migrations::runner()
            .run_async(&mut *client)
            .await
            .map_err(|e| PipelineError::Storage {
                message: format!("migration failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        info!(applied = report.applied_migrations().len(), "ran schema migrations");
    }

    Ok(pool)
}
