mod chatbot;
mod classifier;
mod config;
mod health;
mod openai;

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use chatbot::prompt::{DEFAULT_CURRICULUM, DEFAULT_VALUES};
use chatbot::telegram::Outbox;
use chatbot::{AppState, ChatbotConfig, ChatbotEngine, Command, SystemClock, TelegramClient};
use classifier::KeywordClassifier;
use config::Config;
use openai::Completer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "shakyla.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting {}...", config.family_name);
    info!("Owner: {:?}", config.owner_id);
    if config.dev_mode() {
        info!("DEV MODE: OPENAI_API_KEY not set, chat is echoed");
    }

    let bot = Bot::new(&config.telegram_bot_token);
    let telegram = Arc::new(TelegramClient::new(bot.clone()));

    let completer: Option<Arc<dyn Completer>> = config.openai_api_key.clone().map(|key| {
        let client = openai::Client::new(key, config.openai_base_url.clone(), config.model.clone());
        info!("Model: {}", client.model());
        Arc::new(client) as Arc<dyn Completer>
    });

    let chatbot_config = ChatbotConfig {
        family_name: config.family_name.clone(),
        owner_id: config.owner_id.map(|id| id.0 as i64),
        loop_mode: config.loop_mode,
        background_enabled: config.background_enabled,
        interval_secs: config.interval_secs,
        dm_every_n: config.dm_every_n,
        model: config.model.clone(),
        log_file: Some(config.log_file.clone()),
    };
    let state = AppState::new(
        config.history_cap,
        Some(config.log_file.clone()),
        DEFAULT_VALUES.iter().map(|v| v.to_string()).collect(),
        DEFAULT_CURRICULUM.iter().map(|t| t.to_string()).collect(),
    );
    let engine = Arc::new(ChatbotEngine::new(
        chatbot_config,
        state,
        completer,
        Arc::new(KeywordClassifier),
        telegram.clone() as Arc<dyn Outbox>,
        Arc::new(SystemClock),
    ));

    info!(
        "Loop: {} every {}s",
        engine.config().loop_mode.as_str(),
        engine.config().interval_secs
    );

    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        let family_name = config.family_name.clone();
        let port = config.port;
        tokio::spawn(async move {
            if let Err(e) = health::serve(port, &family_name, shutdown).await {
                error!("Liveness endpoint failed: {}", e);
            }
        });
    }

    let ticker = if config.background_enabled {
        Some(chatbot::ticker::spawn(
            engine.clone(),
            Duration::from_secs(config.interval_secs),
            shutdown.clone(),
        ))
    } else {
        info!("Background loop disabled");
        None
    };

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
                .branch(dptree::endpoint(handle_text)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, telegram])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down");
    shutdown.cancel();
    if let Some(ticker) = ticker
        && let Err(e) = ticker.await
    {
        warn!("Background loop task failed: {}", e);
    }
}

async fn handle_command(
    msg: Message,
    cmd: Command,
    engine: Arc<ChatbotEngine>,
    telegram: Arc<TelegramClient>,
) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };

    let reply = engine.handle_command(user.id.0 as i64, cmd).await;
    telegram.send_text(msg.chat.id.0, &reply).await.ok();
    Ok(())
}

async fn handle_text(
    msg: Message,
    engine: Arc<ChatbotEngine>,
    telegram: Arc<TelegramClient>,
) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };

    if let Some(reply) = engine.handle_text(user.id.0 as i64, text).await {
        telegram.send_text(msg.chat.id.0, &reply).await.ok();
    }
    Ok(())
}

async fn handle_callback(
    q: CallbackQuery,
    engine: Arc<ChatbotEngine>,
    telegram: Arc<TelegramClient>,
) -> ResponseResult<()> {
    let payload = q.data.as_deref().unwrap_or("");
    let reply = engine.handle_callback(q.from.id.0 as i64, payload).await;

    if let (Some(text), Some(message)) = (reply.edit.as_deref(), q.message.as_ref()) {
        telegram
            .edit_message(message.chat().id.0, message.id().0 as i64, text)
            .await
            .ok();
    }
    telegram.answer_callback(&q, &reply.answer).await.ok();
    Ok(())
}
