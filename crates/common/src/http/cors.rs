use http::{header, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origins a browser client may call the API from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub origins: AllowedOrigins,
    /// How long browsers may cache a preflight answer
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: AllowedOrigins::Any,
            max_age: Duration::from_secs(3600),
        }
    }
}

impl CorsConfig {
    /// Parse `"*"` or a comma-separated origin list; blank input allows any
    pub fn from_comma_separated(origins: &str) -> Self {
        let list: Vec<String> = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let origins = if list.is_empty() || list.iter().any(|origin| origin == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(list)
        };

        Self {
            origins,
            ..Self::default()
        }
    }
}

/// Build the CORS layer for the device routes
///
/// Origins that are not valid header values are dropped. `Location` is
/// exposed so browser clients can read the address of a created device.
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let allow_origin = match &config.origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => {
            AllowOrigin::list(list.iter().filter_map(|origin| origin.parse().ok()))
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::LOCATION])
        .max_age(config.max_age)
}
