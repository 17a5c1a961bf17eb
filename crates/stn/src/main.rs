use std::{future::IntoFuture, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use stn_core::{
    bot::{BotSettings, Controller},
    config::{Config, StoreBackend},
    dispatch::Dispatcher,
    ingest::Ingestor,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    registry::Registry,
    store::{memory::MemoryStore, ArticleStore, SubscriptionStore},
};
use stn_sqlite::SqliteStore;
use stn_telegram::{build_bot, router::run_polling, TelegramMessenger};

const VERSION: &str = env!("CARGO_PKG_VERSION");

type Stores = (Arc<dyn SubscriptionStore>, Arc<dyn ArticleStore>);

fn open_stores(cfg: &Config) -> anyhow::Result<Stores> {
    match cfg.store {
        StoreBackend::Sqlite => {
            let subscriptions = SqliteStore::open(&cfg.db_path)
                .with_context(|| format!("opening {}", cfg.db_path.display()))?;
            let articles = SqliteStore::open(&cfg.article_db_path)
                .with_context(|| format!("opening {}", cfg.article_db_path.display()))?;
            let subscriptions: Arc<dyn SubscriptionStore> = Arc::new(subscriptions);
            let articles: Arc<dyn ArticleStore> = Arc::new(articles);
            Ok((subscriptions, articles))
        }
        StoreBackend::Memory => {
            info!("using in-memory store; records are lost on exit");
            let store = Arc::new(MemoryStore::new());
            let subscriptions: Arc<dyn SubscriptionStore> = store.clone();
            let articles: Arc<dyn ArticleStore> = store;
            Ok((subscriptions, articles))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    stn_core::logging::init("stn", cfg.verbose, cfg.log_file.as_deref())?;
    info!(version = VERSION, "starting stn");

    let (subscriptions, articles) = open_stores(&cfg)?;

    let bot = build_bot(&cfg.telegram_bot_token, cfg.telegram_api_url.as_deref())?;
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(
        TelegramMessenger::connect(bot.clone())
            .await
            .context("telegram getMe failed")?,
    );
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let registry = Arc::new(Registry::new(subscriptions));
    let dispatcher = Arc::new(Dispatcher::new(
        messenger.clone(),
        articles.clone(),
        cfg.public_url.clone(),
    ));
    let ingestor = Arc::new(Ingestor::new(registry.clone(), dispatcher));
    let controller = Arc::new(Controller::new(
        registry,
        messenger,
        BotSettings {
            public_url: cfg.public_url.clone(),
            version: VERSION.to_string(),
            prompt_ttl: cfg.prompt_ttl,
            max_pending_prompts: cfg.max_pending_prompts,
        },
    ));

    let app = stn_http::router(
        stn_http::AppState {
            ingestor,
            articles,
            renderer: Arc::new(
                stn_http::render::PageRenderer::new().context("loading page template")?,
            ),
            version: VERSION.to_string(),
        },
        cfg.max_upload_bytes,
    );
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    info!("listening on {}", cfg.listen_addr);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.cancel();
        });
    }

    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future(),
    );

    run_polling(bot, controller, shutdown.clone()).await;
    shutdown.cancel();

    server.await.context("http server task panicked")??;
    info!("stn stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                ctrl_c.await.ok();
                info!("received Ctrl+C, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received Ctrl+C, shutting down");
    }
}
