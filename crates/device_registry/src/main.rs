mod config;

use crate::config::{ServiceConfig, StoreBackend};
use common::domain::DeviceRepository;
use common::http::{CorsConfig, HttpLoggingConfig, HttpServerConfig};
use common::memory::InMemoryDeviceRepository;
use common::postgres::{PostgresClient, PostgresDeviceRepository};
use common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use device_api::{DeviceApi, DeviceService};
use device_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: config.service_name.clone(),
        log_level: config.log_level.clone(),
        log_format: LogFormat::from_name(&config.log_format),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(service = %config.service_name, "Starting device registry");
    debug!("Configuration: {:?}", config);

    let (repository, postgres_client) = match initialize_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize device store: {:#}", e);
            std::process::exit(1);
        }
    };

    let device_service = Arc::new(DeviceService::new(repository));

    let http_config = HttpServerConfig {
        host: config.http_host.clone(),
        port: config.http_port,
        logging_config: HttpLoggingConfig::from_comma_separated(&config.http_ignored_paths),
        cors_config: Some(CorsConfig::from_comma_separated(
            &config.cors_allowed_origins,
        )),
    };

    let device_api = DeviceApi::new(
        device_service,
        http_config,
        Duration::from_secs(config.request_timeout_secs),
    );

    let runner = Runner::new()
        .with_named_process("device_api", device_api.into_runner_process())
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            if let Some(client) = postgres_client {
                client.close();
            }
            info!("Cleanup complete");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

async fn initialize_store(
    config: &ServiceConfig,
) -> anyhow::Result<(Arc<dyn DeviceRepository>, Option<PostgresClient>)> {
    let backend = config.store_backend().map_err(anyhow::Error::msg)?;
    info!(backend = %backend, "Initializing device store...");

    match backend {
        StoreBackend::Memory => Ok((Arc::new(InMemoryDeviceRepository::new()), None)),
        StoreBackend::Postgres => {
            let client = PostgresClient::new(&config.postgres_config())?;
            let startup_timeout = Duration::from_secs(config.startup_timeout_secs);

            tokio::time::timeout(startup_timeout, async {
                client.ping().await?;
                client.run_migrations().await
            })
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "PostgreSQL not ready within {} seconds",
                    config.startup_timeout_secs
                )
            })??;

            let repository = PostgresDeviceRepository::new(client.clone());
            Ok((Arc::new(repository), Some(client)))
        }
    }
}
