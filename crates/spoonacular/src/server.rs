//! Request flow shared by the proxy routes.

use std::net::IpAddr;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use config::{ApiConfig, RouteConfig};
use http::{StatusCode, header};
use rate_limit::{RateLimitManager, Reservation};

use crate::error::Error;
use crate::upstream::UpstreamClient;

/// The proxied routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Search,
    Ingredients,
}

impl Route {
    /// Route name used as the rate-limit partition and in logs.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Route::Search => "search",
            Route::Ingredients => "ingredients",
        }
    }

    fn upstream_path(self) -> &'static str {
        match self {
            Route::Search => "recipes/complexSearch",
            Route::Ingredients => "food/ingredients/autocomplete",
        }
    }
}

/// A normalized success response produced by the proxy. The upstream body
/// is forwarded untouched; only the status and content-type are ours.
pub(crate) struct ProxyResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// Shared state behind the proxy handlers.
pub(crate) struct ProxyServer {
    config: ApiConfig,
    client: UpstreamClient,
    limiter: Arc<RateLimitManager>,
}

impl ProxyServer {
    pub(crate) fn new(config: ApiConfig, limiter: Arc<RateLimitManager>) -> anyhow::Result<Self> {
        let client = UpstreamClient::new(&config.upstream)?;

        Ok(Self {
            config,
            client,
            limiter,
        })
    }

    /// Run the full request flow for a route: parameter policy, rate-limit
    /// admission, fixture short-circuit, upstream call, and outcome
    /// settlement.
    pub(crate) async fn proxy(
        &self,
        route: Route,
        ip: Option<IpAddr>,
        params: Vec<(String, String)>,
    ) -> crate::Result<ProxyResponse> {
        self.check_params(route, &params)?;

        let reservation = self.reserve(route, ip).await?;

        let result = self.forward(route, &params).await;

        let status = match &result {
            Ok(response) => response.status,
            Err(error) => error.status(),
        };

        if let Some(reservation) = reservation {
            self.settle(reservation, status).await;
        }

        result
    }

    fn route_config(&self, route: Route) -> &RouteConfig {
        match route {
            Route::Search => &self.config.search,
            Route::Ingredients => &self.config.ingredients,
        }
    }

    /// Reject denylisted query parameters before they can reach the
    /// limiter or the upstream.
    fn check_params(&self, route: Route, params: &[(String, String)]) -> crate::Result<()> {
        for blocked in &self.route_config(route).blocked_params {
            if params
                .iter()
                .any(|(name, value)| name == blocked && value == "true")
            {
                return Err(Error::ParamDisabled(blocked.clone()));
            }
        }

        Ok(())
    }

    async fn reserve(
        &self,
        route: Route,
        ip: Option<IpAddr>,
    ) -> crate::Result<Option<Reservation>> {
        let Some(ip) = ip else {
            log::debug!(
                "No client address on request - skipping rate limit for {}",
                route.name()
            );

            return Ok(None);
        };

        Ok(self.limiter.check_and_reserve(ip, route.name()).await?)
    }

    async fn settle(&self, reservation: Reservation, status: StatusCode) {
        if let Err(error) = self.limiter.record_outcome(reservation, status).await {
            log::error!("Failed to settle rate limit reservation: {error}");
        }
    }

    async fn forward(
        &self,
        route: Route,
        params: &[(String, String)],
    ) -> crate::Result<ProxyResponse> {
        if route == Route::Search && let Some(fixture) = self.fixture().await {
            return Ok(ProxyResponse {
                status: StatusCode::CREATED,
                body: fixture,
            });
        }

        let response = self.client.get(route.upstream_path(), params).await?;

        Ok(ProxyResponse {
            // The upstream body is always re-emitted with a plain 200, which
            // is also what the deduction rule keys on.
            status: StatusCode::OK,
            body: response.body,
        })
    }

    /// Debug-only short-circuit: serve a canned search response instead of
    /// spending upstream quota.
    async fn fixture(&self) -> Option<Vec<u8>> {
        let debug = &self.config.debug;

        if !debug.enabled {
            return None;
        }

        match tokio::fs::read(&debug.fixture_path).await {
            Ok(contents) => Some(contents),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
            Err(error) => {
                log::warn!(
                    "Failed to read fixture file {}: {error}",
                    debug.fixture_path.display()
                );

                None
            }
        }
    }
}
