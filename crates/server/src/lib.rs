//! Pantry server library.
//!
//! Provides a reusable server function to serve Pantry either for the binary, or for tests.

#![deny(missing_docs)]

mod health;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::{Router, routing::get};
use axum_server::tls_rustls::RustlsConfig;
use config::Config;
use rate_limit::RateLimitManager;
use tokio::net::TcpListener;

/// Configuration for serving Pantry.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Pantry TOML configuration.
    pub config: Config,
}

/// Starts and runs the Pantry server with the provided configuration.
pub async fn serve(ServeConfig { listen_address, config }: ServeConfig) -> anyhow::Result<()> {
    let mut app = Router::new();

    let rate_limit_manager = Arc::new(RateLimitManager::new(
        config.api.rate_limits.clone(),
        spoonacular::route_quotas(&config.api),
    ));

    if config.api.enabled {
        let api_router = spoonacular::router(config.api.clone(), rate_limit_manager.clone())?;

        app = app.merge(api_router);
    } else {
        log::warn!("API proxying is disabled - no proxy endpoints will be exposed");
    }

    if rate_limit_manager.is_enabled() {
        tokio::spawn(prune_counters(
            rate_limit_manager.clone(),
            prune_interval(&config),
        ));
    }

    // Health endpoint is unlimited and added after the proxy routes.
    if config.server.health.enabled {
        if let Some(listen) = config.server.health.listen {
            tokio::spawn(health::bind_health_endpoint(
                listen,
                config.server.tls.clone(),
                config.server.health.clone(),
            ));
        } else {
            app = app.merge(Router::new().route(&config.server.health.path, get(health::health)));
        }
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            log::info!("API endpoint available at: https://{listen_address}{}", config.api.path);

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            log::info!("API endpoint available at: http://{listen_address}{}", config.api.path);

            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    Ok(())
}

/// Periodically drops rate-limit counters whose window has expired, keeping
/// the per-client map bounded over long uptimes.
async fn prune_counters(manager: Arc<RateLimitManager>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match manager.prune_expired().await {
            Ok(0) => {}
            Ok(pruned) => log::debug!("Pruned {pruned} expired rate limit counters"),
            Err(error) => log::warn!("Failed to prune rate limit counters: {error}"),
        }
    }
}

fn prune_interval(config: &Config) -> Duration {
    let longest = config
        .api
        .search
        .rate_limit
        .interval
        .max(config.api.ingredients.rate_limit.interval);

    longest.max(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config::Config;

    use super::prune_interval;

    #[test]
    fn prune_interval_tracks_longest_window() {
        let mut config = Config::default();

        assert_eq!(Duration::from_secs(60), prune_interval(&config));

        config.api.ingredients.rate_limit.interval = Duration::from_secs(300);

        assert_eq!(Duration::from_secs(300), prune_interval(&config));
    }
}
