//! Recipe API proxy configuration structures.

use std::path::PathBuf;
use std::time::Duration;

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::rate_limit::{RateLimitConfig, RateLimitQuota};

const DEFAULT_UPSTREAM_URL: &str = "https://api.spoonacular.com/";

/// Configuration for the recipe API proxy endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Whether the proxy endpoints are exposed.
    pub enabled: bool,
    /// Path prefix under which the proxy routes are mounted.
    pub path: String,
    /// Upstream API client settings.
    pub upstream: UpstreamConfig,
    /// Debug fixture settings for the search route.
    pub debug: DebugConfig,
    /// Rate limiting settings.
    pub rate_limits: RateLimitConfig,
    /// Policy for the recipe search route.
    pub search: RouteConfig,
    /// Policy for the ingredient autocomplete route.
    pub ingredients: RouteConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/api".to_string(),
            upstream: UpstreamConfig::default(),
            debug: DebugConfig::default(),
            rate_limits: RateLimitConfig::default(),
            search: RouteConfig {
                blocked_params: vec!["addRecipeNutrition".to_string()],
                rate_limit: RateLimitQuota {
                    limit: 1,
                    interval: Duration::from_secs(60),
                },
            },
            ingredients: RouteConfig {
                blocked_params: vec!["metaInformation".to_string()],
                rate_limit: RateLimitQuota {
                    limit: 150,
                    interval: Duration::from_secs(60),
                },
            },
        }
    }
}

/// Upstream API client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API.
    pub base_url: Url,
    /// API key injected into every upstream request. Falls back to the
    /// `SPOONACULAR_API_KEY` environment variable when not set.
    pub api_key: Option<SecretString>,
    /// Total timeout applied to each upstream call.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream URL is valid"),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Debug fixture settings.
///
/// When enabled and the fixture file exists, the search route serves the
/// file's contents instead of spending upstream quota. Never enable this in
/// production.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebugConfig {
    /// Whether the fixture short-circuit may activate.
    pub enabled: bool,
    /// Path of the fixture file served when present.
    pub fixture_path: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fixture_path: PathBuf::from("recipe_data.json"),
        }
    }
}

/// Per-route request policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Query parameters rejected with 403 when set to `true`. These would
    /// consume a disproportionate share of the upstream quota.
    #[serde(default)]
    pub blocked_params: Vec<String>,
    /// Admitted requests allowed per client within the interval.
    pub rate_limit: RateLimitQuota,
}
