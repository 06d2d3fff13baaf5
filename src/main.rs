use std::net::SocketAddr;
use std::sync::Arc;

use hanzi_cards::build_router;
use hanzi_cards::cache::RedisCache;
use hanzi_cards::config::Config;
use hanzi_cards::db::Database;
use hanzi_cards::logging::{init_tracing, FileLogSettings};
use hanzi_cards::services::pinyin::PinyinResolver;
use hanzi_cards::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level, FileLogSettings::from_env());

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, url = %config.database_url, "database not initialized");
            std::process::exit(1);
        }
    };

    let cache = match config.redis_url.as_deref() {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("redis listing cache enabled");
                Some(Arc::new(cache))
            }
            Err(err) => {
                tracing::warn!(error = %err, "redis not available, listing cache disabled");
                None
            }
        },
        None => None,
    };

    let resolver = Arc::new(PinyinResolver::new(&config.pinyin_overrides_path));
    let state = AppState::new(db.clone(), resolver, cache);
    let app = build_router(state);

    let addr = config.bind_addr();
    tracing::info!(%addr, "hanzi-cards listening");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "bind listener failed");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, closing database");
    db.close().await;
    tracing::info!("Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
