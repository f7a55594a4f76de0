use crate::domain::DeviceService;
use crate::http::device_handler::{
    create_device, delete_device, get_device, health, list_devices, list_devices_by_brand,
    list_devices_by_state, update_device,
};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Shared state handed to every device handler
#[derive(Clone)]
pub struct DeviceApiState {
    pub service: Arc<DeviceService>,
    shutdown: CancellationToken,
    request_timeout: Duration,
}

impl DeviceApiState {
    pub fn new(
        service: Arc<DeviceService>,
        shutdown: CancellationToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            shutdown,
            request_timeout,
        }
    }

    /// Start the cancellation scope of one request
    ///
    /// The token is cancelled on shutdown, when the request timeout elapses,
    /// or when the returned scope is dropped.
    pub fn request_scope(&self) -> RequestScope {
        let token = self.shutdown.child_token();
        let timer = token.clone();
        let timeout = self.request_timeout;

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    debug!(timeout_ms = timeout.as_millis() as u64, "request deadline elapsed");
                    timer.cancel();
                }
            }
        });

        RequestScope {
            _guard: token.clone().drop_guard(),
            token,
        }
    }
}

/// Cancellation token bound to the lifetime of a single request
pub struct RequestScope {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestScope {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Build the device routes
pub fn build_device_router(state: DeviceApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/devices", get(list_devices).post(create_device))
        .route(
            "/devices/{id}",
            get(get_device).patch(update_device).delete(delete_device),
        )
        .route("/devices/brand/{brand}", get(list_devices_by_brand))
        .route("/devices/state/{state}", get(list_devices_by_state))
        .with_state(state)
}
