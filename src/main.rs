use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use event_payments::adapters::document::MarkdownInvoiceGenerator;
use event_payments::adapters::email::ResendNotificationSender;
use event_payments::adapters::http::{payments_router, BillingAppState};
use event_payments::adapters::manual::ManualGateway;
use event_payments::adapters::memory::{
    InMemoryEventDirectory, InMemoryInvoiceRepository, InMemoryPaymentMethodCatalog,
    InMemoryPaymentRepository, InMemoryRefundRepository, InMemoryWebhookEventRepository,
};
use event_payments::adapters::postgres::{
    PostgresEventDirectory, PostgresInvoiceRepository, PostgresPaymentMethodCatalog,
    PostgresPaymentRepository, PostgresRefundRepository, PostgresWebhookEventRepository,
};
use event_payments::adapters::razorpay::RazorpayGateway;
use event_payments::adapters::stripe::StripeGateway;
use event_payments::application::{
    BillingNotifier, ExpirePendingPaymentsCommand, ExpirePendingPaymentsHandler,
    PurgeWebhookEventsCommand, PurgeWebhookEventsHandler,
};
use event_payments::config::{AppConfig, ServerConfig};
use event_payments::domain::foundation::Timestamp;
use event_payments::ports::{
    EventDirectory, GatewayRegistry, InvoiceRepository, PaymentMethodCatalog, PaymentRepository,
    RefundRepository, WebhookEventRepository,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Repositories {
    directory: Arc<dyn EventDirectory>,
    catalog: Arc<dyn PaymentMethodCatalog>,
    invoices: Arc<dyn InvoiceRepository>,
    payments: Arc<dyn PaymentRepository>,
    refunds: Arc<dyn RefundRepository>,
    webhook_events: Arc<dyn WebhookEventRepository>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = %config.server.environment,
        dev_mode = config.payment.dev_mode,
        "Starting event payments service"
    );

    let repositories = connect(&config).await?;
    let gateways = gateways(&config);
    tracing::info!(providers = ?gateways.providers(), "Payment gateways registered");

    let notifier = BillingNotifier::new(
        repositories.directory.clone(),
        repositories.invoices.clone(),
        Arc::new(ResendNotificationSender::new(&config.email)),
        Arc::new(MarkdownInvoiceGenerator::with_issuer(config.email.from_name.clone())),
    );

    spawn_sweeps(&config, &repositories, notifier.clone());

    let state = BillingAppState {
        directory: repositories.directory,
        catalog: repositories.catalog,
        invoices: repositories.invoices,
        payments: repositories.payments,
        refunds: repositories.refunds,
        webhook_events: repositories.webhook_events,
        gateways,
        notifier,
        default_currency: config.payment.default_currency()?,
        dev_mode: config.payment.dev_mode,
        verbose_errors: config.features.verbose_errors,
    };

    let mut app = payments_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server));
    if config.features.enable_tracing {
        app = app.layer(TraceLayer::new_for_http());
    }

    serve(app, &config.server).await
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn connect(config: &AppConfig) -> Result<Repositories, BoxError> {
    let Some(database) = &config.database else {
        tracing::warn!("No database configured, using in-memory storage");
        return Ok(Repositories {
            directory: Arc::new(InMemoryEventDirectory::new()),
            catalog: Arc::new(InMemoryPaymentMethodCatalog::new()),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            payments: Arc::new(InMemoryPaymentRepository::new()),
            refunds: Arc::new(InMemoryRefundRepository::new()),
            webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
        });
    };

    let pool = database.pool_options().connect(&database.url).await?;
    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Repositories {
        directory: Arc::new(PostgresEventDirectory::new(pool.clone())),
        catalog: Arc::new(PostgresPaymentMethodCatalog::new(pool.clone())),
        invoices: Arc::new(PostgresInvoiceRepository::new(pool.clone())),
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        refunds: Arc::new(PostgresRefundRepository::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
    })
}

fn gateways(config: &AppConfig) -> GatewayRegistry {
    let mut registry = GatewayRegistry::new().with(Arc::new(ManualGateway::new()));

    match config.payment.stripe() {
        Some(stripe) => registry.register(Arc::new(StripeGateway::new(stripe))),
        None => tracing::warn!("Stripe is not configured"),
    }
    match config.payment.razorpay() {
        Some(razorpay) => registry.register(Arc::new(RazorpayGateway::new(razorpay))),
        None => tracing::warn!("Razorpay is not configured"),
    }

    registry
}

/// Periodic expiry of QR payment windows and purge of old webhook records.
fn spawn_sweeps(config: &AppConfig, repositories: &Repositories, notifier: BillingNotifier) {
    let expire = config
        .features
        .expire_pending_payments
        .then(|| ExpirePendingPaymentsHandler::new(repositories.payments.clone(), notifier));
    let purge = PurgeWebhookEventsHandler::new(repositories.webhook_events.clone());
    let retention_days = config.payment.webhook_retention_days;
    let period = Duration::from_secs(config.payment.sweep_interval_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;

            if let Some(expire) = &expire {
                let cmd = ExpirePendingPaymentsCommand {
                    now: Timestamp::now(),
                };
                if let Err(e) = expire.handle(cmd).await {
                    tracing::error!(error = %e, "Payment expiry sweep failed");
                }
            }

            let cmd = PurgeWebhookEventsCommand {
                now: chrono::Utc::now(),
                retention_days,
            };
            if let Err(e) = purge.handle(cmd).await {
                tracing::error!(error = %e, "Webhook purge failed");
            }
        }
    });
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() && !server.is_production() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn serve(app: Router, server: &ServerConfig) -> Result<(), BoxError> {
    let addr = server.socket_addr()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
