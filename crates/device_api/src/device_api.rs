use crate::domain::DeviceService;
use crate::http::{build_device_router, DeviceApiState};
use common::http::{run_http_server, HttpServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DeviceApi {
    service: Arc<DeviceService>,
    config: HttpServerConfig,
    request_timeout: Duration,
}

impl DeviceApi {
    pub fn new(
        service: Arc<DeviceService>,
        config: HttpServerConfig,
        request_timeout: Duration,
    ) -> Self {
        debug!("Initializing device API module");
        Self {
            service,
            config,
            request_timeout,
        }
    }

    /// Serve the device routes until the runner cancels `ctx`
    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move {
                let state = DeviceApiState::new(self.service, ctx.clone(), self.request_timeout);
                let router = build_device_router(state);
                run_http_server(self.config, router, ctx).await
            })
        }
    }
}
