//! Table Gate - Entry point.

use session_store::{Clock, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use table_gate::{
    api::{create_router, AppState},
    config::Config,
    spawn_maintenance, DisabledNotifier, GateStores, Maintenance, Notifier,
    RegistrationWorkflow, WhatsAppNotifier,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use whatsapp_client::WhatsAppClient;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Table Gate for {}", config.venue.name);

    if config.token.secret == "change-this-key" {
        warn!("Using the default token secret; set TOKEN__SECRET before printing QR codes");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Initialize storage
    let stores = GateStores::open(&config, clock.clone()).await;

    // Initialize messaging
    let notifier: Arc<dyn Notifier> = if config.whatsapp.api_url.is_empty() {
        warn!("WHATSAPP__API_URL not set, notifications disabled");
        Arc::new(DisabledNotifier)
    } else {
        match WhatsAppClient::new(
            &config.whatsapp.api_url,
            &config.whatsapp.api_key,
            &config.whatsapp.instance,
            config.whatsapp.timeout,
        ) {
            Ok(client) => {
                if !client.health_check().await {
                    warn!("WhatsApp gateway not reachable at {}", config.whatsapp.api_url);
                }
                info!("WhatsApp notifications via instance {}", client.instance());
                Arc::new(WhatsAppNotifier::new(client, config.whatsapp.timeout))
            }
            Err(e) => {
                error!("Failed to create WhatsApp client: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Background expiry and counter purge
    let maintenance = Maintenance::new(
        stores.sessions.clone(),
        stores.limiter.clone(),
        config.rate_limit.sweep_interval,
    );
    spawn_maintenance(maintenance);

    let workflow = match RegistrationWorkflow::new(&config, stores, clock, notifier) {
        Ok(w) => w,
        Err(e) => {
            error!("Invalid gate configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Bind to address
    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let app = create_router(AppState::new(workflow, config));

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
