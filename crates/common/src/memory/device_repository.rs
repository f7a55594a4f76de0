use crate::domain::{
    DeleteDeviceRepoInput, Device, DeviceRepository, DomainError, DomainResult,
    GetDeviceRepoInput, ListDevicesByBrandRepoInput, ListDevicesByStateRepoInput,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// In-memory implementation of DeviceRepository using HashMap
///
/// Every read hands out clones. A cancelled token is refused before any
/// read or write starts; a write that has started always completes.
#[derive(Clone, Default)]
pub struct InMemoryDeviceRepository {
    devices: Arc<RwLock<HashMap<Uuid, Device>>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn collect_where<F>(
        &self,
        ctx: &CancellationToken,
        predicate: F,
    ) -> DomainResult<Vec<Device>>
    where
        F: Fn(&Device) -> bool,
    {
        ensure_active(ctx)?;
        let devices = self.devices.read().await;
        let mut matched: Vec<Device> = devices
            .values()
            .filter(|d| predicate(d))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.creation_time
                .cmp(&b.creation_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matched)
    }
}

fn ensure_active(ctx: &CancellationToken) -> DomainResult<()> {
    if ctx.is_cancelled() {
        return Err(DomainError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn add_device(&self, device: Device, ctx: CancellationToken) -> DomainResult<()> {
        ensure_active(&ctx)?;
        let mut devices = self.devices.write().await;
        if devices.contains_key(&device.id) {
            return Err(DomainError::DeviceAlreadyExists(device.id.to_string()));
        }
        debug!(device_id = %device.id, "stored device in memory");
        devices.insert(device.id, device);
        Ok(())
    }

    async fn get_device(
        &self,
        input: GetDeviceRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Option<Device>> {
        ensure_active(&ctx)?;
        let devices = self.devices.read().await;
        Ok(devices.get(&input.id).cloned())
    }

    async fn list_devices(&self, ctx: CancellationToken) -> DomainResult<Vec<Device>> {
        self.collect_where(&ctx, |_| true).await
    }

    async fn list_devices_by_brand(
        &self,
        input: ListDevicesByBrandRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        self.collect_where(&ctx, |d| d.brand == input.brand).await
    }

    async fn list_devices_by_state(
        &self,
        input: ListDevicesByStateRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        self.collect_where(&ctx, |d| d.state == input.state).await
    }

    async fn update_device(&self, device: Device, ctx: CancellationToken) -> DomainResult<()> {
        ensure_active(&ctx)?;
        let mut devices = self.devices.write().await;
        match devices.get_mut(&device.id) {
            Some(stored) => {
                *stored = device;
                Ok(())
            }
            None => Err(DomainError::DeviceNotFound(device.id.to_string())),
        }
    }

    async fn delete_device(
        &self,
        input: DeleteDeviceRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<()> {
        ensure_active(&ctx)?;
        let mut devices = self.devices.write().await;
        devices
            .remove(&input.id)
            .map(|_| ())
            .ok_or_else(|| DomainError::DeviceNotFound(input.id.to_string()))
    }
}
