use std::{fmt, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::database::repositories::{
    PostgresJobRepository, PostgresLicenseRepository,
    PostgresRunnerLockRepository, PostgresScheduleRepository,
    PostgresSessionRepository,
};
use crate::error::{CoreError, Result};

/// Statistics about the connection pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_size: u32,
}

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl PostgresDatabase {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(url)
            .await
            .map_err(|e| {
                CoreError::Database(format!("Database connection failed: {e}"))
            })?;

        info!(max_connections, "Database pool initialized");

        Ok(Self::from_pool(pool, max_connections))
    }

    pub fn from_pool(pool: PgPool, max_connections: u32) -> Self {
        Self {
            pool,
            max_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        crate::MIGRATOR.run(&self.pool).await.map_err(|e| {
            CoreError::Database(format!("Migration failed: {e}"))
        })
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_size: self.max_connections,
        }
    }

    pub fn runner_lock_repository(&self) -> PostgresRunnerLockRepository {
        PostgresRunnerLockRepository::new(self.pool.clone())
    }

    pub fn schedule_repository(&self) -> PostgresScheduleRepository {
        PostgresScheduleRepository::new(self.pool.clone())
    }

    pub fn session_repository(&self) -> PostgresSessionRepository {
        PostgresSessionRepository::new(self.pool.clone())
    }

    pub fn license_repository(&self) -> PostgresLicenseRepository {
        PostgresLicenseRepository::new(self.pool.clone())
    }

    pub fn job_repository(&self) -> PostgresJobRepository {
        PostgresJobRepository::new(self.pool.clone())
    }
}
