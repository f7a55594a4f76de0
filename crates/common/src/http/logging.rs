use http::{Method, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{error, info, warn, Instrument, Span};

/// Request log settings
#[derive(Clone, Debug)]
pub struct HttpLoggingConfig {
    /// Path prefixes that are never logged, e.g. `/health`
    pub ignored_paths: Vec<String>,
}

impl Default for HttpLoggingConfig {
    fn default() -> Self {
        Self {
            ignored_paths: vec!["/health".to_string()],
        }
    }
}

impl HttpLoggingConfig {
    pub fn new(ignored_paths: Vec<String>) -> Self {
        Self { ignored_paths }
    }

    /// Parse a comma-separated list of path prefixes
    pub fn from_comma_separated(paths: &str) -> Self {
        Self::new(
            paths
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    fn should_ignore(&self, path: &str) -> bool {
        self.ignored_paths
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }
}

/// Tower layer that logs one line per completed request
#[derive(Clone)]
pub struct HttpLoggingLayer {
    config: HttpLoggingConfig,
}

impl HttpLoggingLayer {
    pub fn new(config: HttpLoggingConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        HttpLoggingService {
            inner: service,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct HttpLoggingService<S> {
    inner: S,
    config: HttpLoggingConfig,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for HttpLoggingService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Error: std::fmt::Display,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let ignored = self.config.should_ignore(&path);
        let started = Instant::now();
        let future = self.inner.call(req);

        Box::pin(
            async move {
                let result = future.await;
                if !ignored {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    match &result {
                        Ok(response) => log_response(&method, &path, response.status(), elapsed_ms),
                        Err(e) => error!(
                            method = %method,
                            path = %path,
                            duration_ms = elapsed_ms,
                            error = %e,
                            "{} {} failed after {}ms",
                            method,
                            path,
                            elapsed_ms
                        ),
                    }
                }
                result
            }
            .instrument(Span::current()),
        )
    }
}

fn log_response(method: &Method, path: &str, status: StatusCode, elapsed_ms: u64) {
    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            http_status = status.as_u16(),
            duration_ms = elapsed_ms,
            "{} {} -> {} in {}ms",
            method,
            path,
            status,
            elapsed_ms
        );
    } else {
        info!(
            method = %method,
            path = %path,
            http_status = status.as_u16(),
            duration_ms = elapsed_ms,
            "{} {} -> {} in {}ms",
            method,
            path,
            status,
            elapsed_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_ignore_matches_prefix() {
        let config = HttpLoggingConfig::from_comma_separated("/health, /metrics");
        assert!(config.should_ignore("/health"));
        assert!(config.should_ignore("/metrics/prometheus"));
        assert!(!config.should_ignore("/devices"));
    }

    #[test]
    fn test_default_ignores_health() {
        assert!(HttpLoggingConfig::default().should_ignore("/health"));
    }
}
