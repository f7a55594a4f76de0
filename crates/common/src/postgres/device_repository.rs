use crate::domain::{
    DeleteDeviceRepoInput, Device, DeviceRepository, DeviceState, DomainError, DomainResult,
    GetDeviceRepoInput, ListDevicesByBrandRepoInput, ListDevicesByStateRepoInput,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

const SELECT_DEVICES: &str = "SELECT id, name, brand, state, creation_time FROM devices";

/// Device row for PostgreSQL storage
#[derive(Debug, Clone)]
pub struct DeviceRow {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub state: i16,
    pub creation_time: DateTime<Utc>,
}

impl DeviceRow {
    fn from_row(row: &Row) -> DomainResult<Self> {
        Ok(Self {
            id: row.try_get("id").map_err(repository_error)?,
            name: row.try_get("name").map_err(repository_error)?,
            brand: row.try_get("brand").map_err(repository_error)?,
            state: row.try_get("state").map_err(repository_error)?,
            creation_time: row.try_get("creation_time").map_err(repository_error)?,
        })
    }
}

/// Convert database DeviceRow to domain Device
impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let state = DeviceState::try_from(row.state)
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(Device {
            id: row.id,
            name: row.name,
            brand: row.brand,
            state,
            creation_time: row.creation_time,
        })
    }
}

fn repository_error(e: tokio_postgres::Error) -> DomainError {
    DomainError::RepositoryError(e.into())
}

fn rows_to_devices(rows: &[Row]) -> DomainResult<Vec<Device>> {
    rows.iter()
        .map(|row| DeviceRow::from_row(row).and_then(Device::try_from))
        .collect()
}

/// PostgreSQL implementation of DeviceRepository trait
///
/// Reads race the cancellation token. Writes check it once before the
/// statement is sent and then run to completion.
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    async fn connection(&self, ctx: &CancellationToken) -> DomainResult<deadpool_postgres::Client> {
        tokio::select! {
            _ = ctx.cancelled() => Err(DomainError::Cancelled),
            conn = self.client.get_connection() => conn.map_err(DomainError::RepositoryError),
        }
    }

    async fn query_devices(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
        ctx: &CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        let conn = self.connection(ctx).await?;

        let rows = tokio::select! {
            _ = ctx.cancelled() => return Err(DomainError::Cancelled),
            rows = conn.query(sql, params) => rows.map_err(repository_error)?,
        };

        rows_to_devices(&rows)
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self, device, ctx), fields(device_id = %device.id))]
    async fn add_device(&self, device: Device, ctx: CancellationToken) -> DomainResult<()> {
        let conn = self.connection(&ctx).await?;
        if ctx.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let result = conn
            .execute(
                "INSERT INTO devices (id, name, brand, state, creation_time)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &device.id,
                    &device.name,
                    &device.brand,
                    &device.state.as_i16(),
                    &device.creation_time,
                ],
            )
            .await;

        if let Err(e) = result {
            // PostgreSQL error code 23505 is unique_violation
            if let Some(db_err) = e.as_db_error() {
                if db_err.code().code() == "23505" {
                    return Err(DomainError::DeviceAlreadyExists(device.id.to_string()));
                }
            }
            return Err(repository_error(e));
        }

        debug!(device_id = %device.id, "inserted device");
        Ok(())
    }

    #[instrument(skip(self, input, ctx), fields(device_id = %input.id))]
    async fn get_device(
        &self,
        input: GetDeviceRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Option<Device>> {
        let sql = format!("{} WHERE id = $1", SELECT_DEVICES);
        let mut devices = self.query_devices(&sql, &[&input.id], &ctx).await?;
        Ok(devices.pop())
    }

    #[instrument(skip(self, ctx))]
    async fn list_devices(&self, ctx: CancellationToken) -> DomainResult<Vec<Device>> {
        let sql = format!("{} ORDER BY creation_time, id", SELECT_DEVICES);
        let devices = self.query_devices(&sql, &[], &ctx).await?;
        debug!(count = devices.len(), "listed devices");
        Ok(devices)
    }

    #[instrument(skip(self, input, ctx), fields(brand = %input.brand))]
    async fn list_devices_by_brand(
        &self,
        input: ListDevicesByBrandRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        let sql = format!(
            "{} WHERE brand = $1 ORDER BY creation_time, id",
            SELECT_DEVICES
        );
        let devices = self.query_devices(&sql, &[&input.brand], &ctx).await?;
        debug!(count = devices.len(), brand = %input.brand, "listed devices by brand");
        Ok(devices)
    }

    #[instrument(skip(self, input, ctx), fields(state = %input.state))]
    async fn list_devices_by_state(
        &self,
        input: ListDevicesByStateRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        let sql = format!(
            "{} WHERE state = $1 ORDER BY creation_time, id",
            SELECT_DEVICES
        );
        let state = input.state.as_i16();
        let devices = self.query_devices(&sql, &[&state], &ctx).await?;
        debug!(count = devices.len(), state = %input.state, "listed devices by state");
        Ok(devices)
    }

    #[instrument(skip(self, device, ctx), fields(device_id = %device.id))]
    async fn update_device(&self, device: Device, ctx: CancellationToken) -> DomainResult<()> {
        let conn = self.connection(&ctx).await?;
        if ctx.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let updated = conn
            .execute(
                "UPDATE devices SET name = $2, brand = $3, state = $4 WHERE id = $1",
                &[
                    &device.id,
                    &device.name,
                    &device.brand,
                    &device.state.as_i16(),
                ],
            )
            .await
            .map_err(repository_error)?;

        if updated == 0 {
            return Err(DomainError::DeviceNotFound(device.id.to_string()));
        }

        debug!(device_id = %device.id, "updated device");
        Ok(())
    }

    #[instrument(skip(self, input, ctx), fields(device_id = %input.id))]
    async fn delete_device(
        &self,
        input: DeleteDeviceRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<()> {
        let conn = self.connection(&ctx).await?;
        if ctx.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let deleted = conn
            .execute("DELETE FROM devices WHERE id = $1", &[&input.id])
            .await
            .map_err(repository_error)?;

        if deleted == 0 {
            return Err(DomainError::DeviceNotFound(input.id.to_string()));
        }

        debug!(device_id = %input.id, "deleted device");
        Ok(())
    }
}
