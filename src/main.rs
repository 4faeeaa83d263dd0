use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use storefront::bot::{self, Engine};
use storefront::catalog::default_products;
use storefront::config::{Config, LogFormat};
use storefront::db::{self, PgStorage};
use storefront::health;
use storefront::instance_lock::InstanceLock;
use storefront::localization::t;
use storefront::notifier::{AdminNotifier, NotifierHandle, TelegramAdminChannel};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    info!("Starting farm storefront bot");

    // Refuse to run next to another instance polling the same token
    let _instance_lock = InstanceLock::acquire(config.instance_lock_port)?;

    info!("Connecting to database");
    let storage = PgStorage::connect(&config.database_url, config.db_max_connections).await?;
    db::init_database_schema(storage.pool()).await?;

    let seeded = db::seed_products(storage.pool(), &default_products()).await?;
    if seeded > 0 {
        info!(seeded, "Seeded default catalog");
    }
    db::seed_admins(storage.pool(), &config.admin_ids).await?;
    let storage = Arc::new(storage);

    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            error!(error = %e, "Healthcheck server failed");
        }
    });

    let (notifier, notifications) = NotifierHandle::channel();
    let admin_notifier = AdminNotifier::new(
        Arc::clone(&storage),
        TelegramAdminChannel::new(Bot::new(&config.admin_bot_token)),
        config.notify_pacing,
    );
    tokio::spawn(admin_notifier.run(notifications));

    let engine = Arc::new(Engine::new(Arc::clone(&storage), notifier));
    if let Err(e) = engine.catalog().refresh().await {
        warn!(error = %e, "Initial catalog load failed");
    }

    let bot = Bot::new(&config.bot_token);
    let commands = vec![
        BotCommand::new("start", t("cmd-start")),
        BotCommand::new("help", t("cmd-help")),
        BotCommand::new("cancel", t("cmd-cancel")),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler::<PgStorage>))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler::<PgStorage>));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}
