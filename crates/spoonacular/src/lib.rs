//! Proxy endpoints for the upstream recipe API.
//!
//! Requests flow through a parameter denylist, per-client rate-limit
//! admission, and a single upstream attempt. Successful bodies pass
//! through untouched; upstream failures are forwarded verbatim and local
//! failures are wrapped in a JSON error envelope.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use config::{ApiConfig, RateLimitQuota};
use rate_limit::RateLimitManager;

mod error;
mod request;
mod server;
mod upstream;

use error::Error;
use request::ClientIp;
use server::{ProxyServer, Route};

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Creates an axum router for the recipe proxy endpoints.
pub fn router(config: ApiConfig, limiter: Arc<RateLimitManager>) -> anyhow::Result<Router> {
    if config.upstream.api_key.is_none() {
        log::warn!(
            "No upstream API key configured - set SPOONACULAR_API_KEY or [api.upstream] api_key. \
            Upstream calls will go out without credentials and be rejected by the provider."
        );
    }

    let server = Arc::new(ProxyServer::new(config.clone(), limiter)?);

    let api_routes = Router::new()
        .route("/search", get(search))
        .route("/ingredients", get(ingredients))
        .with_state(server);

    Ok(Router::new().nest(&config.path, api_routes))
}

/// Per-route rate limit rules drawn from the configuration.
pub fn route_quotas(config: &ApiConfig) -> BTreeMap<String, RateLimitQuota> {
    BTreeMap::from([
        (
            Route::Search.name().to_string(),
            config.search.rate_limit.clone(),
        ),
        (
            Route::Ingredients.name().to_string(),
            config.ingredients.rate_limit.clone(),
        ),
    ])
}

/// Handle recipe search requests.
async fn search(
    State(server): State<Arc<ProxyServer>>,
    ClientIp(ip): ClientIp,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse> {
    log::debug!("Search request with {} query parameters", params.len());

    server.proxy(Route::Search, ip, params).await
}

/// Handle ingredient autocomplete requests.
async fn ingredients(
    State(server): State<Arc<ProxyServer>>,
    ClientIp(ip): ClientIp,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse> {
    log::debug!("Ingredient request with {} query parameters", params.len());

    server.proxy(Route::Ingredients, ip, params).await
}
