use std::{sync::Arc, time::Duration};

use message_dispatch::{
    application::{
        handlers::message_dispatcher::{DispatchConfig, MessageDispatchHandler},
        services::{delivery_cache::DeliveryCache, dispatch_scheduler::DispatchScheduler},
        usecases::{
            create_message::CreateMessageUseCase, list_sent_messages::ListSentMessagesUseCase,
        },
    },
    config::Config,
    infrastructure::{
        cache::redis::RedisDeliveryCache,
        outbound::http::{HttpTransport, HttpTransportConfig},
        repositories::postgres::PostgresMessageStore,
    },
    presentation::http::{build_app, endpoints::root::ApiState},
    telemetry::init_tracing,
};
use poem::{Server, listener::TcpListener};
use tokio::main;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[main]
async fn main() -> anyhow::Result<()> {
    let config = Config::try_parse()?;
    init_tracing(config.is_prod());

    let store =
        PostgresMessageStore::connect(&config.database_url, config.database_max_connections)
            .await?;
    store.migrate().await?;
    info!("database ready");

    let cache: Option<Arc<dyn DeliveryCache>> = match &config.redis_url {
        Some(url) => Some(Arc::new(RedisDeliveryCache::connect(url).await?)),
        None => {
            info!("REDIS_URL not set, delivery cache disabled");
            None
        }
    };

    let transport = HttpTransport::new(HttpTransportConfig {
        url: config.outbound.url.clone(),
        timeout: config.outbound.timeout,
        max_retries: config.outbound.max_retries,
        retry_base_delay: config.outbound.retry_delay,
        expect_status: config.outbound.expect_status,
        auth_header: config.outbound.auth_header.clone(),
        auth_value: config.outbound.auth_value.clone(),
    })?;

    let handler = MessageDispatchHandler::new(
        store.clone(),
        Arc::new(transport),
        cache,
        DispatchConfig {
            batch_size: config.scheduler.batch_size,
            cache_ttl: config.cache_ttl,
        },
    );
    let scheduler = Arc::new(DispatchScheduler::new(
        Arc::new(handler),
        config.scheduler.interval,
    ));

    let root = CancellationToken::new();
    if config.scheduler.enabled {
        scheduler.start(&root);
    } else {
        info!("scheduler disabled at boot, start it over HTTP");
    }

    let state = Arc::new(ApiState {
        create_message_usecase: Arc::new(CreateMessageUseCase::new(store.clone())),
        list_sent_usecase: Arc::new(ListSentMessagesUseCase::new(store)),
        scheduler: scheduler.clone(),
        root: root.clone(),
    });

    let server_url = format!("http://{}:{}", config.host, config.port);
    let app = build_app(state, &server_url, !config.is_prod());

    info!(%server_url, env = ?config.env, "starting server");
    Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run_with_graceful_shutdown(app, shutdown_signal(), Some(Duration::from_secs(10)))
        .await?;

    scheduler.shutdown("server shutdown").await;
    root.cancel();
    info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
