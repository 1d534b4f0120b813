//! # pricectl: group ratios and model pricing for an LLM gateway
//!
//! `pricectl` owns the pricing tables of a multi-tenant LLM gateway and serves the pricing page.
//! Every user belongs to a *group*, and every group has a *ratio* that multiplies the per-model
//! price. Administrators can override the ratio a specific requester group pays for a target group,
//! so the same group may cost different amounts depending on who is asking.
//!
//! ## Tables
//!
//! Four option tables drive pricing, each persisted as JSON in an option store and mirrored in
//! memory for lock-free reads:
//!
//! - `ModelRatio`: per-model price multiplier
//! - `GroupRatio`: per-group price multiplier
//! - `GroupGroupRatio`: `{requester group: {target group: ratio}}` overrides
//! - `UserUsableGroups`: groups every caller may see, with display labels
//!
//! Writes follow persist-then-apply: the store is updated first and the mirror only after the
//! store confirmed, so the mirror never holds a value that is not persisted. A failed or
//! timed-out persist leaves the mirror untouched and is reported with `success: false`.
//!
//! ## Request Flow
//!
//! An auth proxy in front of this service sets a header with the caller's user id. The
//! [`Identity`](types::Identity) extractor resolves it through a cached
//! [`UserDirectory`](db::users::UserDirectory); anything that does not resolve is anonymous.
//! `GET /pricing` then combines the catalog, the model ratio mirror and the
//! [`RatioResolver`](ratios::RatioResolver) output for that caller.
//!
//! ## Storage
//!
//! By default options and users live in memory. With the `postgres` feature and an external
//! database configured, both are stored in PostgreSQL and migrations run at startup.
//!
//! ## Getting Started
//!
//! ```bash
//! # In-memory, default tables on port 3001
//! pricectl
//!
//! # Against PostgreSQL
//! DATABASE_URL=postgres://localhost/pricectl pricectl -f config.yaml
//! ```
//!
//! See [`config`] for the configuration file format.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
mod openapi;
pub mod pricing;
pub mod ratios;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::{self, HeaderValue},
    routing::{get, post, put},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;

use crate::api::handlers;
use crate::config::{CorsOrigin, DatabaseConfig};
use crate::db::options::{InMemoryOptionStore, OptionStore};
use crate::db::users::{CachedUserDirectory, InMemoryUserDirectory, UserDirectory};
use crate::openapi::ApiDoc;
use crate::pricing::{PricingView, Recommendation};
use crate::ratios::reset::RatioResetOperation;
use crate::ratios::sync::OptionSync;
use crate::ratios::{ConfiguredVisibilityPolicy, RatioResolver, RatioStore};

/// Migrations for the PostgreSQL option store and user directory
#[cfg(feature = "postgres")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Shared state handed to every handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    /// Cached user lookups for the identity extractors
    pub users: Arc<dyn UserDirectory>,
    pub pricing: PricingView,
    pub reset: RatioResetOperation,
    pub options: OptionSync,
    pub recommendations: Arc<[Recommendation]>,
}

/// Backends selected by `config.database`
pub struct Storage {
    pub options: Arc<dyn OptionStore>,
    pub users: Arc<dyn UserDirectory>,
    pool: Option<sqlx::PgPool>,
}

impl Storage {
    /// In-memory stores, with the directory seeded from `config.users`
    pub fn in_memory(config: &Config) -> Self {
        Self {
            options: Arc::new(InMemoryOptionStore::new()),
            users: Arc::new(InMemoryUserDirectory::with_users(config.users.iter().cloned())),
            pool: None,
        }
    }

    async fn connect(config: &Config) -> anyhow::Result<Self> {
        match &config.database {
            DatabaseConfig::Memory => {
                info!(users = config.users.len(), "Using in-memory option store and user directory");
                Ok(Self::in_memory(config))
            }
            #[cfg(feature = "postgres")]
            DatabaseConfig::External { url, pool } => {
                use crate::db::postgres::{PostgresOptionStore, PostgresUserDirectory};
                use std::time::Duration;

                info!("Connecting to external database");
                let mut options = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(pool.max_connections)
                    .min_connections(pool.min_connections)
                    .acquire_timeout(Duration::from_secs(pool.acquire_timeout_secs));
                if pool.idle_timeout_secs > 0 {
                    options = options.idle_timeout(Duration::from_secs(pool.idle_timeout_secs));
                }
                if pool.max_lifetime_secs > 0 {
                    options = options.max_lifetime(Duration::from_secs(pool.max_lifetime_secs));
                }
                let pg = options.connect(url).await.context("connecting to the external database")?;
                MIGRATOR.run(&pg).await.context("running migrations")?;

                Ok(Self {
                    options: Arc::new(PostgresOptionStore::new(pg.clone())),
                    users: Arc::new(PostgresUserDirectory::new(pg.clone())),
                    pool: Some(pg),
                })
            }
            #[cfg(not(feature = "postgres"))]
            DatabaseConfig::External { .. } => {
                anyhow::bail!("An external database is configured but pricectl was built without the `postgres` feature")
            }
        }
    }
}

/// Wire the ratio mirror, visibility policy and option sync together and load persisted options.
///
/// Persisted options replace the values seeded from `config.ratios` and `config.visibility`.
#[instrument(skip_all)]
pub async fn build_state(config: Config, options: Arc<dyn OptionStore>, users: Arc<dyn UserDirectory>) -> anyhow::Result<AppState> {
    let store = Arc::new(RatioStore::new(
        config.ratios.group_ratios.clone(),
        config.ratios.group_group_ratios.clone(),
        config.ratios.model_ratios.clone(),
    ));
    let visibility = Arc::new(ConfiguredVisibilityPolicy::new(
        config.visibility.usable_groups.clone(),
        config.visibility.anonymous_group.clone(),
        config.visibility.user_group_label.clone(),
    ));
    let write_timeout = config.ratios.option_write_timeout;

    let option_sync = OptionSync::new(store.clone(), visibility.clone(), options.clone(), write_timeout);
    option_sync.load_persisted().await.context("loading persisted options")?;

    let users: Arc<dyn UserDirectory> = Arc::new(CachedUserDirectory::new(
        users,
        config.auth.identity_cache.capacity,
        config.auth.identity_cache.ttl,
    ));
    let resolver = RatioResolver::new(store.clone(), visibility);
    let pricing = PricingView::new(
        Arc::new(config.catalog.clone()),
        store.clone(),
        resolver,
        config.visibility.auto_groups.clone(),
    );
    let reset = RatioResetOperation::new(store, options, write_timeout);
    let recommendations: Arc<[Recommendation]> = config.recommendations.clone().into();

    Ok(AppState::builder()
        .config(config)
        .users(users)
        .pricing(pricing)
        .reset(reset)
        .options(option_sync)
        .recommendations(recommendations)
        .build())
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    // A wildcard cannot be mixed into an origin list
    let allow_origin = if config.cors.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry the trailing slash `Url` adds
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the router with all endpoints and middleware.
///
/// Prometheus metrics are only mounted when `enable_metrics` is set: the layer installs a
/// process-global recorder, so it can be built once per process.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/pricing", get(handlers::pricing::get_pricing))
        .route("/pricing/reset-model-ratio", post(handlers::pricing::reset_model_ratio))
        .route("/pricing/recommend", get(handlers::pricing::get_recommendations))
        .route("/option", put(handlers::options::update_option))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer);

    if enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// A configured server, ready to be served.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<sqlx::PgPool>,
}

impl Application {
    /// Connect storage, load persisted options and build the router
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let storage = Storage::connect(&config).await?;
        Self::with_storage(config, storage).await
    }

    /// Build on top of already constructed storage backends
    pub async fn with_storage(config: Config, storage: Storage) -> anyhow::Result<Self> {
        let state = build_state(config.clone(), storage.options, storage.users).await?;
        let router = build_router(state)?;
        Ok(Self {
            router,
            config,
            pool: storage.pool,
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("pricectl listening on http://{}, docs at http://localhost:{}/docs", bind_addr, self.config.port);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
