use anyhow::Context as _;
use bones_bot::config::Config;
use bones_bot::handler::{Bot, InvitePolicy};
use bones_bot::hydrus::HydrusClient;
use bones_bot::matrix::MatrixAdapter;
use bones_bot::models::ContentLocator;
use bones_bot::resolver::MediaResolver;
use bones_shared::constants::APP_NAME;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bones_bot=info".into()),
        )
        .init();

    let config = Config::load().context("failed to load configuration")?;

    let hydrus = HydrusClient::new(&config.hydrus_api, &config.hydrus_token);
    let locator = ContentLocator::new(&config.locator_host, &config.locator_prefix);
    let resolver = MediaResolver::new(hydrus, locator);

    let adapter = MatrixAdapter::connect(&config).await?;
    let bot = Arc::new(Bot::new(resolver, adapter.chat()));
    let invites = InvitePolicy::new(config.invite_senders.clone());

    tracing::info!(
        homeserver = %config.homeserver,
        hydrus = %config.hydrus_api,
        "{} bot starting",
        APP_NAME
    );

    tokio::select! {
        result = adapter.run(bot, invites) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}
