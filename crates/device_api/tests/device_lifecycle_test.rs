use async_trait::async_trait;
use chrono::Utc;
use common::domain::{
    DeleteDeviceRepoInput, Device, DeviceRepository, DeviceState, DomainResult, ErrorCategory,
    GetDeviceRepoInput, ListDevicesByBrandRepoInput, ListDevicesByStateRepoInput, OutcomeError,
};
use common::memory::InMemoryDeviceRepository;
use device_api::{CreateDeviceRequest, DevicePatch, DeviceService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn new_service() -> DeviceService {
    DeviceService::new(Arc::new(InMemoryDeviceRepository::new()))
}

fn request(name: &str, brand: &str, state: DeviceState) -> Option<CreateDeviceRequest> {
    Some(CreateDeviceRequest {
        name: name.to_string(),
        brand: brand.to_string(),
        state,
    })
}

async fn add(service: &DeviceService, name: &str, brand: &str, state: DeviceState) -> Device {
    service
        .add(request(name, brand, state), CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_added_device_is_retrievable() {
    let service = new_service();
    let before = Utc::now();

    let created = add(&service, "Lamp", "Acme", DeviceState::Available).await;
    let fetched = service
        .get_by_id(created.id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fetched.name, "Lamp");
    assert_eq!(fetched.brand, "Acme");
    assert_eq!(fetched.state, DeviceState::Available);
    assert_eq!(fetched.id, created.id);
    assert!((fetched.creation_time - before).num_seconds() < 5);
}

#[tokio::test]
async fn test_add_absent_device_is_invalid_input() {
    let service = new_service();

    let err = service.add(None, CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.code, OutcomeError::INVALID_INPUT);
    assert_eq!(err.category, ErrorCategory::Validation);
}

#[tokio::test]
async fn test_each_add_gets_a_distinct_id() {
    let service = new_service();

    let first = add(&service, "Lamp", "Acme", DeviceState::Available).await;
    let second = add(&service, "Lamp", "Acme", DeviceState::Available).await;

    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let service = new_service();

    let err = service
        .get_by_id(Uuid::new_v4(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_list_on_empty_store_is_success() {
    let service = new_service();

    let devices = service.list(CancellationToken::new()).await.unwrap();

    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_filters_without_matches_are_not_found() {
    let service = new_service();
    add(&service, "Lamp", "Acme", DeviceState::Available).await;

    let by_brand = service
        .list_by_brand("Globex".to_string(), CancellationToken::new())
        .await
        .unwrap_err();
    let by_state = service
        .list_by_state(DeviceState::Inactive, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(by_brand.category, ErrorCategory::NotFound);
    assert!(by_brand.message.contains("Globex"));
    assert_eq!(by_state.category, ErrorCategory::NotFound);
    assert!(by_state.message.contains("Inactive"));
}

#[tokio::test]
async fn test_filters_return_only_matching_devices() {
    let service = new_service();
    let lamp = add(&service, "Lamp", "Acme", DeviceState::Available).await;
    let fan = add(&service, "Fan", "Globex", DeviceState::InUse).await;

    let acme = service
        .list_by_brand("Acme".to_string(), CancellationToken::new())
        .await
        .unwrap();
    let in_use = service
        .list_by_state(DeviceState::InUse, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(acme, vec![lamp]);
    assert_eq!(in_use, vec![fan]);
}

#[tokio::test]
async fn test_in_use_device_keeps_name_and_brand() {
    let service = new_service();
    let device = add(&service, "Lamp", "Acme", DeviceState::InUse).await;

    let patch = DevicePatch {
        name: Some("Desk Lamp".to_string()),
        ..Default::default()
    };
    let err = service
        .update(device.id, Some(patch), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.code, OutcomeError::INVALID_OPERATION);
    let unchanged = service
        .get_by_id(device.id, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(unchanged, device);
}

#[tokio::test]
async fn test_in_use_device_can_change_state() {
    let service = new_service();
    let device = add(&service, "Lamp", "Acme", DeviceState::InUse).await;

    let patch = DevicePatch {
        state: Some(DeviceState::Inactive),
        ..Default::default()
    };
    service
        .update(device.id, Some(patch), CancellationToken::new())
        .await
        .unwrap();

    let updated = service
        .get_by_id(device.id, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(updated.state, DeviceState::Inactive);
    assert_eq!(updated.creation_time, device.creation_time);
}

#[tokio::test]
async fn test_released_device_can_be_renamed() {
    let service = new_service();
    let device = add(&service, "Lamp", "Acme", DeviceState::InUse).await;
    let ctx = CancellationToken::new();

    let release = DevicePatch {
        state: Some(DeviceState::Available),
        ..Default::default()
    };
    service
        .update(device.id, Some(release), ctx.clone())
        .await
        .unwrap();

    let rename = DevicePatch {
        name: Some("Desk Lamp".to_string()),
        brand: Some("Globex".to_string()),
        ..Default::default()
    };
    service
        .update(device.id, Some(rename), ctx.clone())
        .await
        .unwrap();

    let renamed = service.get_by_id(device.id, ctx).await.unwrap();
    assert_eq!(renamed.name, "Desk Lamp");
    assert_eq!(renamed.brand, "Globex");
}

#[tokio::test]
async fn test_in_use_device_cannot_be_deleted() {
    let service = new_service();
    let device = add(&service, "Lamp", "Acme", DeviceState::InUse).await;

    let err = service
        .delete(device.id, CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.code, OutcomeError::INVALID_OPERATION);
    assert!(service
        .get_by_id(device.id, CancellationToken::new())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_available_device_is_deleted() {
    let service = new_service();
    let device = add(&service, "Lamp", "Acme", DeviceState::Available).await;

    service
        .delete(device.id, CancellationToken::new())
        .await
        .unwrap();

    let err = service
        .get_by_id(device.id, CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_empty_patch_leaves_device_unchanged() {
    let service = new_service();
    let device = add(&service, "Lamp", "Acme", DeviceState::Inactive).await;

    service
        .update(
            device.id,
            Some(DevicePatch::default()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let fetched = service
        .get_by_id(device.id, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fetched, device);
}

#[tokio::test]
async fn test_concurrent_updates_all_commit() {
    let service = Arc::new(new_service());
    let device = add(&service, "Lamp", "Acme", DeviceState::Available).await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = Arc::clone(&service);
        let id = device.id;
        handles.push(tokio::spawn(async move {
            let patch = DevicePatch {
                name: Some(format!("Lamp {}", i)),
                ..Default::default()
            };
            service
                .update(id, Some(patch), CancellationToken::new())
                .await
        }));
    }

    for result in futures::future::join_all(handles).await {
        assert!(result.unwrap().is_ok());
    }

    let fetched = service
        .get_by_id(device.id, CancellationToken::new())
        .await
        .unwrap();
    assert!(fetched.name.starts_with("Lamp "));
}

/// Store whose reads never complete
struct StalledRepository;

#[async_trait]
impl DeviceRepository for StalledRepository {
    async fn add_device(&self, _device: Device, _ctx: CancellationToken) -> DomainResult<()> {
        Ok(())
    }

    async fn get_device(
        &self,
        _input: GetDeviceRepoInput,
        _ctx: CancellationToken,
    ) -> DomainResult<Option<Device>> {
        std::future::pending().await
    }

    async fn list_devices(&self, _ctx: CancellationToken) -> DomainResult<Vec<Device>> {
        std::future::pending().await
    }

    async fn list_devices_by_brand(
        &self,
        _input: ListDevicesByBrandRepoInput,
        _ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        std::future::pending().await
    }

    async fn list_devices_by_state(
        &self,
        _input: ListDevicesByStateRepoInput,
        _ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>> {
        std::future::pending().await
    }

    async fn update_device(&self, _device: Device, _ctx: CancellationToken) -> DomainResult<()> {
        Ok(())
    }

    async fn delete_device(
        &self,
        _input: DeleteDeviceRepoInput,
        _ctx: CancellationToken,
    ) -> DomainResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cancelled_read_aborts_promptly() {
    let service = DeviceService::new(Arc::new(StalledRepository));
    let ctx = CancellationToken::new();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(2), service.list(ctx))
        .await
        .expect("list should observe cancellation")
        .unwrap_err();

    assert_eq!(err.code, OutcomeError::CANCELLED);
}

#[tokio::test]
async fn test_cancelled_update_makes_no_mutation() {
    let repository = Arc::new(InMemoryDeviceRepository::new());
    let service = DeviceService::new(repository.clone());
    let device = add(&service, "Lamp", "Acme", DeviceState::Available).await;

    let ctx = CancellationToken::new();
    ctx.cancel();
    let patch = DevicePatch {
        name: Some("Desk Lamp".to_string()),
        ..Default::default()
    };
    let err = service
        .update(device.id, Some(patch), ctx)
        .await
        .unwrap_err();

    assert_eq!(err.code, OutcomeError::CANCELLED);
    let stored = repository
        .get_device(GetDeviceRepoInput { id: device.id }, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stored, Some(device));
}
