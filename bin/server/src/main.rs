use barbot_conversation::{Dispatcher, SessionStore};
use barbot_core::Result;
use barbot_integration::{MapLinkBuilder, YelpClient};
use barbot_server::{
    bot::Bot, config::ServerConfig, error::StartupError, telegram::TelegramClient,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    config
        .core
        .validate()
        .map_err(|e| StartupError::InvalidConfig {
            details: e.to_string(),
        })?;
    tracing::info!("Loaded configuration");

    let search = YelpClient::new(config.yelp, config.core.upstream_timeout()).map_err(|e| {
        StartupError::Client {
            details: e.to_string(),
        }
    })?;
    let telegram = TelegramClient::new(&config.telegram).map_err(|e| StartupError::Client {
        details: e.to_string(),
    })?;
    let maps = MapLinkBuilder::new(config.maps, config.core.marker_cap);

    let store = Arc::new(SessionStore::new());
    let reaper = store.spawn_reaper(
        config.core.eviction_interval(),
        config.core.idle_timeout(),
    );

    let eviction_interval = config.core.eviction_interval();
    let dispatcher = Arc::new(Dispatcher::new(search, maps, Arc::clone(&store), config.core));

    // Rate limit windows are pruned on the same cadence as idle sessions
    let pruner = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            let mut interval = tokio::time::interval(eviction_interval);
            loop {
                interval.tick().await;
                let pruned = dispatcher.prune_rate_limits();
                if pruned > 0 {
                    tracing::debug!(pruned, "Pruned expired rate limit windows");
                }
            }
        }
    });

    tracing::info!("Polling Telegram for updates");
    Bot::new(telegram, dispatcher)
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    reaper.abort();
    pruner.abort();
    tracing::info!(sessions = store.len(), "Shut down");
    Ok(())
}
