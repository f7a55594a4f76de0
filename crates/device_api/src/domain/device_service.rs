use chrono::Utc;
use common::domain::{
    DeleteDeviceRepoInput, Device, DeviceRepository, DeviceState, DomainError, DomainResult,
    GetDeviceRepoInput, ListDevicesByBrandRepoInput, ListDevicesByStateRepoInput, Outcome,
    OutcomeError,
};
use garde::Validate;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const ADD_FAILED: &str = "An error occurred while adding the device to the repository.";
const GET_FAILED: &str = "An error occurred while retrieving the device from the repository.";
const LIST_FAILED: &str = "An error occurred while retrieving devices from the repository.";
const UPDATE_FAILED: &str = "An error occurred while updating the device in the repository.";
const DELETE_FAILED: &str = "An error occurred while deleting the device from the repository.";

/// Service request for registering a device
///
/// Carries no identifier or creation time: both are assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    #[garde(length(chars, min = 1, max = 100))]
    pub name: String,
    #[garde(length(chars, min = 1, max = 100))]
    pub brand: String,
    #[serde(default)]
    #[garde(skip)]
    pub state: DeviceState,
}

/// Partial update of a device. An absent field is left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct DevicePatch {
    #[garde(length(chars, min = 1, max = 100))]
    pub name: Option<String>,
    #[garde(length(chars, min = 1, max = 100))]
    pub brand: Option<String>,
    #[garde(skip)]
    pub state: Option<DeviceState>,
}

impl DevicePatch {
    /// True when the patch would change the name or brand of `device`
    fn touches_identity_of(&self, device: &Device) -> bool {
        let name_changed = self.name.as_ref().is_some_and(|name| *name != device.name);
        let brand_changed = self
            .brand
            .as_ref()
            .is_some_and(|brand| *brand != device.brand);
        name_changed || brand_changed
    }

    fn apply_to(self, device: &mut Device) {
        if let Some(name) = self.name {
            device.name = name;
        }
        if let Some(brand) = self.brand {
            device.brand = brand;
        }
        if let Some(state) = self.state {
            device.state = state;
        }
    }
}

/// Domain service for the device lifecycle
///
/// Owns every business rule: input validation, identity and timestamp
/// assignment, and the guard that freezes a device while it is `InUse`.
/// Holds no state between calls; each operation re-reads the store.
pub struct DeviceService {
    repository: Arc<dyn DeviceRepository>,
}

impl DeviceService {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self { repository }
    }

    /// Register a new device, assigning a fresh id and the current UTC time
    #[instrument(skip(self, request, ctx))]
    pub async fn add(
        &self,
        request: Option<CreateDeviceRequest>,
        ctx: CancellationToken,
    ) -> Outcome<Device> {
        let request =
            request.ok_or_else(|| OutcomeError::invalid_input("Device model cannot be null."))?;
        common::garde::validate_struct(&request)?;

        let device = Device {
            id: Uuid::new_v4(),
            name: request.name,
            brand: request.brand,
            state: request.state,
            creation_time: Utc::now(),
        };

        debug!(device_id = %device.id, brand = %device.brand, "adding device");

        ensure_active(&ctx)?;
        self.repository
            .add_device(device.clone(), ctx)
            .await
            .map_err(|e| store_failure(e, ADD_FAILED))?;

        debug!(device_id = %device.id, "device added");
        Ok(device)
    }

    #[instrument(skip(self, id, ctx), fields(device_id = %id))]
    pub async fn get_by_id(&self, id: Uuid, ctx: CancellationToken) -> Outcome<Device> {
        self.load(id, &ctx).await
    }

    /// List every device. An empty registry is a success.
    #[instrument(skip(self, ctx))]
    pub async fn list(&self, ctx: CancellationToken) -> Outcome<Vec<Device>> {
        ensure_active(&ctx)?;
        let devices = race(&ctx, self.repository.list_devices(ctx.clone()))
            .await
            .map_err(|e| store_failure(e, LIST_FAILED))?;

        debug!(count = devices.len(), "listed devices");
        Ok(devices)
    }

    /// List devices of one brand. No match is a `NotFound` failure.
    #[instrument(skip(self, brand, ctx), fields(brand = %brand))]
    pub async fn list_by_brand(
        &self,
        brand: String,
        ctx: CancellationToken,
    ) -> Outcome<Vec<Device>> {
        ensure_active(&ctx)?;
        let input = ListDevicesByBrandRepoInput {
            brand: brand.clone(),
        };
        let devices = race(&ctx, self.repository.list_devices_by_brand(input, ctx.clone()))
            .await
            .map_err(|e| store_failure(e, LIST_FAILED))?;

        if devices.is_empty() {
            return Err(OutcomeError::not_found(format!(
                "No devices found for brand {}.",
                brand
            )));
        }

        debug!(count = devices.len(), "listed devices by brand");
        Ok(devices)
    }

    /// List devices in one state. No match is a `NotFound` failure.
    #[instrument(skip(self, state, ctx), fields(state = %state))]
    pub async fn list_by_state(
        &self,
        state: DeviceState,
        ctx: CancellationToken,
    ) -> Outcome<Vec<Device>> {
        ensure_active(&ctx)?;
        let input = ListDevicesByStateRepoInput { state };
        let devices = race(&ctx, self.repository.list_devices_by_state(input, ctx.clone()))
            .await
            .map_err(|e| store_failure(e, LIST_FAILED))?;

        if devices.is_empty() {
            return Err(OutcomeError::not_found(format!(
                "No devices found in state {}.",
                state
            )));
        }

        debug!(count = devices.len(), "listed devices by state");
        Ok(devices)
    }

    /// Apply a partial update
    ///
    /// Name and brand are frozen while the device is currently `InUse`; the
    /// check runs against the stored state before anything is applied, and a
    /// rejection leaves the device untouched. State changes are always
    /// allowed. A patch that changes nothing is still written.
    #[instrument(skip(self, id, patch, ctx), fields(device_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: Option<DevicePatch>,
        ctx: CancellationToken,
    ) -> Outcome {
        let patch =
            patch.ok_or_else(|| OutcomeError::invalid_input("Device patch cannot be null."))?;
        common::garde::validate_struct(&patch)?;

        let mut device = self.load(id, &ctx).await?;

        if device.state == DeviceState::InUse && patch.touches_identity_of(&device) {
            warn!(device_id = %id, "rejected name or brand change on an active device");
            return Err(OutcomeError::invalid_operation(format!(
                "Cannot update the name or brand on an active device. Deviceid: {}",
                id
            )));
        }

        patch.apply_to(&mut device);

        ensure_active(&ctx)?;
        self.repository
            .update_device(device, ctx)
            .await
            .map_err(|e| store_failure(e, UPDATE_FAILED))?;

        debug!(device_id = %id, "device updated");
        Ok(())
    }

    /// Remove a device unless it is currently `InUse`
    #[instrument(skip(self, id, ctx), fields(device_id = %id))]
    pub async fn delete(&self, id: Uuid, ctx: CancellationToken) -> Outcome {
        let device = self.load(id, &ctx).await?;

        if device.state == DeviceState::InUse {
            warn!(device_id = %id, "rejected delete of an active device");
            return Err(OutcomeError::invalid_operation(format!(
                "Cannot delete an active device. Deviceid: {}",
                id
            )));
        }

        ensure_active(&ctx)?;
        self.repository
            .delete_device(DeleteDeviceRepoInput { id }, ctx)
            .await
            .map_err(|e| store_failure(e, DELETE_FAILED))?;

        debug!(device_id = %id, "device deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid, ctx: &CancellationToken) -> Outcome<Device> {
        ensure_active(ctx)?;
        race(
            ctx,
            self.repository
                .get_device(GetDeviceRepoInput { id }, ctx.clone()),
        )
        .await
        .map_err(|e| store_failure(e, GET_FAILED))?
        .ok_or_else(|| device_not_found(&id.to_string()))
    }
}

fn ensure_active(ctx: &CancellationToken) -> Outcome<()> {
    if ctx.is_cancelled() {
        debug!("operation cancelled before reaching the store");
        return Err(OutcomeError::cancelled());
    }
    Ok(())
}

/// Race a store read against the caller's token
async fn race<T, F>(ctx: &CancellationToken, read: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(DomainError::Cancelled),
        result = read => result,
    }
}

fn device_not_found(id: &str) -> OutcomeError {
    OutcomeError::not_found(format!("Device with Id {} was not found.", id))
}

/// Convert a store error into a failure; raw fault text only reaches the log
fn store_failure(err: DomainError, message: &str) -> OutcomeError {
    match err {
        DomainError::DeviceNotFound(id) => device_not_found(&id),
        DomainError::Cancelled => OutcomeError::cancelled(),
        other => {
            error!(error = %other, "device store fault");
            OutcomeError::repository_error(message)
        }
    }
}
