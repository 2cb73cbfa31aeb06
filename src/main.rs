use std::sync::Arc;

use anyhow::Context;

use order_assist::channels::whatsapp::{
    AppState, RecordingTransport, Transport, WhatsAppClient, webhook_routes,
};
use order_assist::config::AppConfig;
use order_assist::conversation::ConversationEngine;
use order_assist::delivery::{DeliveryEligibility, DeliveryZoneCatalog, StaticZoneCatalog};
use order_assist::gateway::CustomerStateGateway;
use order_assist::geocode::{Geocoder, GoogleGeocoder, OfflineGeocoder};
use order_assist::service::ConversationService;
use order_assist::store::{CustomerStore, InMemoryStore, LibSqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;

    eprintln!("🍕 Order Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);

    // ── Storage ─────────────────────────────────────────────────────────
    let store: Arc<dyn CustomerStore> = match &config.db_path {
        Some(path) => {
            let store = LibSqlStore::new_local(path)
                .await
                .with_context(|| format!("opening database at {}", path.display()))?;
            eprintln!("   Database: {}", path.display());
            Arc::new(store)
        }
        None => {
            eprintln!("   Database: in-memory (ORDER_ASSIST_DB_PATH not set)");
            Arc::new(InMemoryStore::new())
        }
    };

    // ── Delivery ────────────────────────────────────────────────────────
    let zones = match &config.zones_path {
        Some(path) => StaticZoneCatalog::from_json_file(path)
            .with_context(|| format!("loading delivery zones from {}", path.display()))?,
        None => StaticZoneCatalog::default_zones(),
    };
    eprintln!("   Delivery zones: {}", zones.len());
    let catalog: Arc<dyn DeliveryZoneCatalog> = Arc::new(zones);

    let geocoder: Arc<dyn Geocoder> = match &config.google_maps_api_key {
        Some(key) => Arc::new(GoogleGeocoder::new(key.clone())),
        None => Arc::new(OfflineGeocoder),
    };
    eprintln!("   Geocoder: {}", geocoder.name());

    let eligibility = Arc::new(DeliveryEligibility::new(
        catalog,
        geocoder,
        config.eligibility.clone(),
    ));

    // ── Transport ───────────────────────────────────────────────────────
    let transport: Arc<dyn Transport> = match WhatsAppClient::from_config(&config.whatsapp) {
        Some(client) => Arc::new(client),
        None => {
            tracing::warn!(
                "META_ACCESS_TOKEN or META_PHONE_NUMBER_ID not set; outbound messages are logged only"
            );
            Arc::new(RecordingTransport::new())
        }
    };
    eprintln!("   Transport: {}", transport.name());

    // ── Service ─────────────────────────────────────────────────────────
    let service = ConversationService::new(
        ConversationEngine::new(eligibility, config.engine.clone()),
        CustomerStateGateway::new(store),
        transport,
        config.dispatch_pacing,
    );
    let app = webhook_routes(AppState {
        service: Arc::new(service),
        config: Arc::new(config.whatsapp.clone()),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    tracing::info!(port = config.port, "Webhook server started");
    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
