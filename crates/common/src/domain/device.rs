use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Operational state of a device.
///
/// Any state may move to any other through an update. While a device is
/// `InUse` its name and brand are frozen and it cannot be deleted.
/// Serialized by name; deserialized from a name or its numeric encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DeviceState {
    #[default]
    Available,
    InUse,
    Inactive,
}

impl DeviceState {
    /// Stable numeric encoding used by storage
    pub fn as_i16(&self) -> i16 {
        match self {
            DeviceState::Available => 0,
            DeviceState::InUse => 1,
            DeviceState::Inactive => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Available => "Available",
            DeviceState::InUse => "InUse",
            DeviceState::Inactive => "Inactive",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct DeviceStateVisitor;

impl Visitor<'_> for DeviceStateVisitor {
    type Value = DeviceState;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a device state name or its numeric value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        i16::try_from(v)
            .map_err(|_| ParseDeviceStateError(v.to_string()))
            .and_then(DeviceState::try_from)
            .map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i16::try_from(v)
            .map_err(|_| ParseDeviceStateError(v.to_string()))
            .and_then(DeviceState::try_from)
            .map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DeviceStateVisitor)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid device state: {0}")]
pub struct ParseDeviceStateError(pub String);

impl TryFrom<i16> for DeviceState {
    type Error = ParseDeviceStateError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceState::Available),
            1 => Ok(DeviceState::InUse),
            2 => Ok(DeviceState::Inactive),
            other => Err(ParseDeviceStateError(other.to_string())),
        }
    }
}

/// Accepts the state name in any case (`in_use` and `in-use` included) or its
/// numeric encoding.
impl FromStr for DeviceState {
    type Err = ParseDeviceStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<i16>() {
            return DeviceState::try_from(number);
        }

        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "available" => Ok(DeviceState::Available),
            "inuse" => Ok(DeviceState::InUse),
            "inactive" => Ok(DeviceState::Inactive),
            _ => Err(ParseDeviceStateError(s.to_string())),
        }
    }
}

/// Domain representation of a Device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Assigned by the lifecycle service at creation, immutable afterwards
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub state: DeviceState,
    /// Assigned by the lifecycle service at creation, immutable afterwards
    pub creation_time: DateTime<Utc>,
}

/// Repository input for retrieving a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceRepoInput {
    pub id: Uuid,
}

/// Repository input for deleting a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDeviceRepoInput {
    pub id: Uuid,
}

/// Repository input for listing devices of one brand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDevicesByBrandRepoInput {
    pub brand: String,
}

/// Repository input for listing devices in one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDevicesByStateRepoInput {
    pub state: DeviceState,
}

/// Repository trait for device storage operations
///
/// Implementations must hand out owned copies: mutating a returned device never
/// changes stored state without going through `update_device`.
/// Every call receives the caller's cancellation token; whether a cancelled
/// token stops a write that has already been issued is up to the store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Insert a new device
    async fn add_device(&self, device: Device, ctx: CancellationToken) -> DomainResult<()>;

    /// Get a device by ID
    async fn get_device(
        &self,
        input: GetDeviceRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Option<Device>>;

    /// List every device
    async fn list_devices(&self, ctx: CancellationToken) -> DomainResult<Vec<Device>>;

    /// List devices with an exact brand match
    async fn list_devices_by_brand(
        &self,
        input: ListDevicesByBrandRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>>;

    /// List devices in a state
    async fn list_devices_by_state(
        &self,
        input: ListDevicesByStateRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<Vec<Device>>;

    /// Overwrite a stored device (last write wins)
    async fn update_device(&self, device: Device, ctx: CancellationToken) -> DomainResult<()>;

    /// Remove a device
    async fn delete_device(
        &self,
        input: DeleteDeviceRepoInput,
        ctx: CancellationToken,
    ) -> DomainResult<()>;
}
