use ledger_bot::{
    BotServerConfig, ChannelMembership, Dispatcher, TelegramClient, TelegramNotifier,
    WebhookServer,
};
use ledger_core::{AppConfig, LedgerStore};
use ledger_db::{DatabaseConfig, DatabasePool, PgLedgerStore};
use ledger_engine::{Engine, RetryingStore, SystemClock};
use ledger_metrics::{MetricsConfig, MetricsServer};
use ledger_store::MemoryStore;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("ledger_engine=info".parse()?)
                .add_directive("ledger_bot=info".parse()?),
        )
        .init();

    info!("BNB Earner starting...");

    let config = match AppConfig::load() {
        Ok(config) => {
            info!(
                operator_id = config.operator_id,
                channel = %config.telegram.channel_username,
                daily_bonus = %config.bonus.daily_bonus,
                referral_bonus = %config.bonus.referral_bonus,
                min_withdrawal = %config.bonus.min_withdrawal,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    // Metrics (optional - only if METRICS_PORT or METRICS_ENABLED is set)
    if let Some(metrics_config) = MetricsConfig::from_env() {
        match ledger_metrics::init() {
            Ok(handle) => {
                let metrics_server = MetricsServer::new(metrics_config, handle);
                tokio::spawn(async move {
                    if let Err(e) = metrics_server.run().await {
                        error!(error = %e, "Metrics server error");
                    }
                });
                info!("Metrics server started");
            }
            Err(e) => warn!(error = %e, "Metrics disabled, recorder could not be installed"),
        }
    }

    // Storage: Postgres when DATABASE_URL is set, otherwise in memory
    let (store, db_pool): (Arc<dyn LedgerStore>, Option<DatabasePool>) =
        match DatabaseConfig::from_env() {
            Some(db_config) => {
                let pool = match DatabasePool::new(&db_config).await {
                    Ok(pool) => pool,
                    Err(e) => {
                        error!(error = %e, "Failed to connect to database");
                        std::process::exit(1);
                    }
                };
                if let Err(e) = pool.migrate().await {
                    error!(error = %e, "Failed to run database migrations");
                    std::process::exit(1);
                }
                info!("Database connected and migrations applied");
                let store: Arc<dyn LedgerStore> = Arc::new(RetryingStore::new(
                    PgLedgerStore::new(pool.clone()),
                    &config.storage,
                ));
                (store, Some(pool))
            }
            None => {
                warn!("DATABASE_URL not set, balances will not survive a restart");
                let store: Arc<dyn LedgerStore> =
                    Arc::new(RetryingStore::new(MemoryStore::new(), &config.storage));
                (store, None)
            }
        };

    let api = match TelegramClient::new(&config.telegram.bot_token) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to build Telegram client");
            std::process::exit(1);
        }
    };

    let engine = Arc::new(Engine::new(
        &config,
        store.clone(),
        Arc::new(TelegramNotifier::new(api.clone())),
        Arc::new(SystemClock),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        engine.clone(),
        api.clone(),
        Arc::new(ChannelMembership::new(
            api.clone(),
            &config.telegram.channel_username,
        )),
        config.telegram.clone(),
    ));

    let server_config = BotServerConfig::from_env();
    match server_config.webhook_url(&config.telegram.bot_token) {
        Some(url) => match api.set_webhook(&url).await {
            Ok(()) => info!("Webhook registered"),
            Err(e) => warn!(error = %e, "Failed to register webhook"),
        },
        None => warn!("PUBLIC_URL not set, webhook must be registered externally"),
    }

    // Status printer, gauges and expired reject sessions
    let status_engine = engine.clone();
    let status_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            let expired = status_engine.workflow.purge_expired_sessions();

            match status_store.stats().await {
                Ok(stats) => {
                    info!(
                        users = stats.total_users,
                        referrals = stats.total_referrals,
                        pending = stats.pending_count,
                        pending_amount = %stats.pending_amount,
                        expired_sessions = expired,
                        "Status"
                    );
                    ledger_metrics::gauges::set_users(stats.total_users);
                    ledger_metrics::gauges::set_pending_withdrawals(stats.pending_count);
                }
                Err(e) => warn!(error = %e, "Failed to read ledger stats"),
            }
        }
    });

    let server = WebhookServer::new(server_config, dispatcher, &config.telegram.bot_token);
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received (Ctrl+C)");
    };
    if let Err(e) = server.run(shutdown).await {
        error!(error = %e, "Webhook server error");
        std::process::exit(1);
    }

    info!("Shutting down...");

    if let Some(pool) = db_pool {
        pool.close().await;
        info!("Database connections closed");
    }

    info!("BNB Earner shutdown complete");
    Ok(())
}
