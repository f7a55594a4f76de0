use super::PostgresConfig;
use anyhow::Result;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Ordered schema migrations, applied idempotently at startup
const MIGRATIONS: &[(&str, &str)] = &[(
    "00001_create_devices",
    include_str!("../../migrations/postgres/00001_create_devices.sql"),
)];

/// Pooled connection handle shared by the device store
#[derive(Clone)]
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Builds the pool; no connection is opened until first use
    pub fn new(config: &PostgresConfig) -> Result<Self> {
        let pool = Config {
            host: Some(config.host.clone()),
            port: Some(config.port),
            dbname: Some(config.database.clone()),
            user: Some(config.username.clone()),
            password: Some(config.password.clone()),
            manager: Some(ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            }),
            pool: Some(PoolConfig::new(config.max_pool_size)),
            ..Config::default()
        }
        .create_pool(Some(Runtime::Tokio1), NoTls)?;

        Ok(Self { pool })
    }

    /// Pings the database to verify connectivity
    pub async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("SELECT 1", &[]).await?;
        debug!("postgreSQL connection successful");
        Ok(())
    }

    /// Applies the embedded schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        let client = self.pool.get().await?;
        for (name, sql) in MIGRATIONS {
            debug!(migration = %name, "applying migration");
            client.batch_execute(sql).await?;
        }
        info!(count = MIGRATIONS.len(), "postgreSQL migrations applied");
        Ok(())
    }

    /// Gets a connection from the pool
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }

    /// Closes the pool; checked-out connections are dropped when returned
    pub fn close(&self) {
        self.pool.close();
        info!("postgreSQL pool closed");
    }
}
