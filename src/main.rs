//! Subscription Sync server.

use std::sync::Arc;

use axum::Router;
use http::{header, HeaderName, HeaderValue, Method};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subscription_sync::adapters::http::{subscription_router, SubscriptionAppState};
use subscription_sync::adapters::paypal::PayPalBillingAdapter;
use subscription_sync::adapters::postgres::{PostgresSubscriptionRepository, MIGRATOR};
use subscription_sync::adapters::rollback::{HttpRollbackClient, ProviderCompensator};
use subscription_sync::application::{
    SubscriptionRollbackCoordinator, VerificationMode, WebhookVerifier,
};
use subscription_sync::config::{AppConfig, ConfigError, ServerConfig, ValidationError};
use subscription_sync::domain::foundation::{Clock, SystemClock};
use subscription_sync::domain::subscription::CertUrlPolicy;
use subscription_sync::ports::{BillingProvider, SubscriptionCompensator};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting subscription sync"
    );

    // Database
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Billing provider
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let billing: Arc<dyn BillingProvider> =
        Arc::new(PayPalBillingAdapter::from_config(&config.billing, clock.clone())?);

    let mode = VerificationMode::resolve(config.billing.verification_bypass, config.is_production());
    let webhook_verifier = Arc::new(WebhookVerifier::new(
        billing.clone(),
        CertUrlPolicy::new(config.billing.cert_domain_list()),
        config.billing.webhook_id().map(str::to_string),
        mode,
    ));

    // Compensation
    let compensator: Arc<dyn SubscriptionCompensator> = match &config.billing.rollback_url {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!(rollback_url = %url, "Compensating through the cancellation endpoint");
            let http_client = reqwest::Client::builder()
                .timeout(config.billing.rollback_timeout())
                .build()?;
            Arc::new(HttpRollbackClient::new(http_client, url.as_str()))
        }
        _ => Arc::new(ProviderCompensator::new(billing.clone())),
    };
    let rollback = Arc::new(SubscriptionRollbackCoordinator::new(
        compensator,
        config.billing.rollback_timeout(),
    ));

    let state = SubscriptionAppState {
        repository: Arc::new(PostgresSubscriptionRepository::new(pool)),
        billing_provider: billing,
        webhook_verifier,
        rollback,
        clock,
    };

    let app = Router::new()
        .nest("/api", subscription_router())
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// JSON output in production, human-readable otherwise.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", server.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-user-id")])
}
