//! Device handlers: bind raw HTTP input, call one lifecycle operation and
//! render its outcome.

use crate::domain::{CreateDeviceRequest, DevicePatch};
use crate::http::{ApiError, DeviceApiState};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::domain::{Device, DeviceState, OutcomeError};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

fn parse_device_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError(OutcomeError::invalid_input(format!(
            "'{}' is not a valid device id.",
            raw
        )))
    })
}

fn parse_device_state(raw: &str) -> Result<DeviceState, ApiError> {
    raw.parse::<DeviceState>().map_err(|_| {
        ApiError(OutcomeError::invalid_input(format!(
            "'{}' is not a valid device state.",
            raw
        )))
    })
}

/// Decode an optional JSON body; an empty body or `null` is absent
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body).map_err(|e| {
        ApiError(OutcomeError::invalid_input(format!(
            "Malformed request body: {}",
            e
        )))
    })
}

pub async fn health() -> &'static str {
    "ok"
}

#[instrument(name = "ListDevices", skip_all)]
pub async fn list_devices(
    State(state): State<DeviceApiState>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let scope = state.request_scope();
    let devices = state.service.list(scope.token()).await?;
    Ok(Json(devices))
}

#[instrument(name = "GetDevice", skip_all, fields(device_id = %id))]
pub async fn get_device(
    State(state): State<DeviceApiState>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let id = parse_device_id(&id)?;
    let scope = state.request_scope();
    let device = state.service.get_by_id(id, scope.token()).await?;
    Ok(Json(device))
}

#[instrument(name = "ListDevicesByBrand", skip_all, fields(brand = %brand))]
pub async fn list_devices_by_brand(
    State(state): State<DeviceApiState>,
    Path(brand): Path<String>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let scope = state.request_scope();
    let devices = state.service.list_by_brand(brand, scope.token()).await?;
    Ok(Json(devices))
}

#[instrument(name = "ListDevicesByState", skip_all, fields(state = %raw_state))]
pub async fn list_devices_by_state(
    State(state): State<DeviceApiState>,
    Path(raw_state): Path<String>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let device_state = parse_device_state(&raw_state)?;
    let scope = state.request_scope();
    let devices = state
        .service
        .list_by_state(device_state, scope.token())
        .await?;
    Ok(Json(devices))
}

/// Responds `201 Created` with the device and a `Location` header
#[instrument(name = "CreateDevice", skip_all)]
pub async fn create_device(
    State(state): State<DeviceApiState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = parse_body::<CreateDeviceRequest>(&body)?;
    let scope = state.request_scope();
    let device = state.service.add(request, scope.token()).await?;

    debug!(device_id = %device.id, "device created");

    let location = format!("/devices/{}", device.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(device),
    )
        .into_response())
}

#[instrument(name = "UpdateDevice", skip_all, fields(device_id = %id))]
pub async fn update_device(
    State(state): State<DeviceApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let id = parse_device_id(&id)?;
    let patch = parse_body::<DevicePatch>(&body)?;
    let scope = state.request_scope();
    state.service.update(id, patch, scope.token()).await?;
    Ok(StatusCode::OK)
}

#[instrument(name = "DeleteDevice", skip_all, fields(device_id = %id))]
pub async fn delete_device(
    State(state): State<DeviceApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_device_id(&id)?;
    let scope = state.request_scope();
    state.service.delete(id, scope.token()).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_treats_null_and_empty_as_absent() {
        let empty: Option<DevicePatch> = parse_body(&Bytes::from_static(b"  ")).unwrap();
        let null: Option<DevicePatch> = parse_body(&Bytes::from_static(b"null")).unwrap();

        assert!(empty.is_none());
        assert!(null.is_none());
    }

    #[test]
    fn test_parse_body_ignores_client_supplied_identity() {
        let body = Bytes::from_static(
            br#"{"id":"00000000-0000-0000-0000-000000000001","name":"Lamp","brand":"Acme","creationTime":"2001-01-01T00:00:00Z"}"#,
        );
        let request: Option<CreateDeviceRequest> = parse_body(&body).unwrap();

        let request = request.unwrap();
        assert_eq!(request.name, "Lamp");
        assert_eq!(request.state, DeviceState::Available);
    }

    #[test]
    fn test_parse_body_accepts_numeric_state() {
        let patch: DevicePatch = parse_body(&Bytes::from_static(br#"{"state":1}"#))
            .unwrap()
            .unwrap();
        assert_eq!(patch.state, Some(DeviceState::InUse));

        let request: CreateDeviceRequest =
            parse_body(&Bytes::from_static(br#"{"name":"a","brand":"b","state":2}"#))
                .unwrap()
                .unwrap();
        assert_eq!(request.state, DeviceState::Inactive);
    }

    #[test]
    fn test_parse_body_rejects_out_of_range_state() {
        let err = parse_body::<DevicePatch>(&Bytes::from_static(br#"{"state":9}"#)).unwrap_err();
        assert_eq!(err.0.code, OutcomeError::INVALID_INPUT);
    }

    #[test]
    fn test_parse_body_rejects_malformed_json() {
        let err = parse_body::<DevicePatch>(&Bytes::from_static(b"{\"name\":")).unwrap_err();
        assert_eq!(err.0.code, OutcomeError::INVALID_INPUT);
    }

    #[test]
    fn test_parse_device_state_accepts_aliases() {
        assert_eq!(parse_device_state("in-use").unwrap(), DeviceState::InUse);
        assert_eq!(parse_device_state("2").unwrap(), DeviceState::Inactive);
        assert!(parse_device_state("retired").is_err());
    }

    #[test]
    fn test_parse_device_id_rejects_garbage() {
        let err = parse_device_id("not-a-uuid").unwrap_err();
        assert!(err.0.message.contains("not-a-uuid"));
    }
}
